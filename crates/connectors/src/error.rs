use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by row sources and the streams built on top of them.
///
/// Every variant is fatal to the stream that raised it. Nothing in this crate
/// retries; a caller that wants to retry builds a new stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The store could not be reached.
    #[error("Connection to '{target}' failed: {source}")]
    Connection {
        target: String,
        #[source]
        source: BoxError,
    },

    /// The store rejected the query.
    #[error("Query rejected: {source} (sql: {sql})")]
    Query {
        sql: String,
        #[source]
        source: BoxError,
    },

    /// The connection broke while pulling rows from an open cursor.
    #[error("Fetch failed after {rows_read} row(s): {source}")]
    Fetch {
        rows_read: usize,
        #[source]
        source: BoxError,
    },

    /// A caller-supplied argument was rejected before any I/O took place.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A CSV input could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    pub fn connection(target: &str, source: impl Into<BoxError>) -> Self {
        StreamError::Connection {
            target: target.to_string(),
            source: source.into(),
        }
    }

    pub fn query(sql: &str, source: impl Into<BoxError>) -> Self {
        StreamError::Query {
            sql: sql.to_string(),
            source: source.into(),
        }
    }

    pub fn fetch(rows_read: usize, source: impl Into<BoxError>) -> Self {
        StreamError::Fetch {
            rows_read,
            source: source.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        StreamError::InvalidArgument(message.into())
    }
}
