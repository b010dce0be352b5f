use crate::stream::PullStream;
use async_trait::async_trait;
use connectors::{
    error::StreamError,
    sql::base::{
        query::Query,
        source::{CursorGuard, RowCursor, RowSource},
    },
};
use model::records::row::RowData;
use tracing::{debug, info};

/// Forward-only, single-pass stream of the rows of one query.
///
/// The stream owns exactly one cursor. The cursor is released on the first
/// of: end of data, a fetch error, or the stream being dropped. Once
/// released it is never reopened; a fresh scan needs a fresh `RowStream`.
pub struct RowStream {
    cursor: Option<CursorGuard>,
    entity: String,
    rows_read: usize,
}

impl RowStream {
    pub async fn open(source: &dyn RowSource, query: &Query) -> Result<Self, StreamError> {
        let cursor = source.open(query).await?;
        info!(source = %source.describe(), entity = %query.entity, "Row stream opened");
        Ok(Self::from_cursor(&query.entity, cursor))
    }

    pub fn from_cursor(entity: &str, cursor: Box<dyn RowCursor>) -> Self {
        RowStream {
            cursor: Some(CursorGuard::new(cursor)),
            entity: entity.to_string(),
            rows_read: 0,
        }
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// True once the cursor has been released.
    pub fn is_finished(&self) -> bool {
        self.cursor.is_none()
    }

    fn release(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
    }
}

#[async_trait]
impl PullStream for RowStream {
    type Item = RowData;

    async fn next(&mut self) -> Result<Option<RowData>, StreamError> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };

        match cursor.next().await {
            Ok(Some(row)) => {
                self.rows_read += 1;
                Ok(Some(row))
            }
            Ok(None) => {
                self.release();
                debug!(entity = %self.entity, rows = self.rows_read, "Row stream exhausted");
                Ok(None)
            }
            Err(err) => {
                self.release();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::into_stream;
    use connectors::memory::{Faults, MemoryRowSource};
    use futures::TryStreamExt;
    use model::core::value::{FieldValue, Value};

    fn users(ages: &[i64]) -> Vec<RowData> {
        ages.iter()
            .enumerate()
            .map(|(id, age)| {
                RowData::new(
                    "user_data",
                    vec![
                        FieldValue::new("user_id", Value::Int(id as i64 + 1)),
                        FieldValue::new("age", Value::Int(*age)),
                    ],
                )
            })
            .collect()
    }

    fn query() -> Query {
        Query::table("user_data", None)
    }

    #[tokio::test]
    async fn test_yields_rows_in_order_then_closes() {
        let source = MemoryRowSource::new("users", users(&[30, 45, 50]));
        let mut stream = RowStream::open(&source, &query()).await.unwrap();

        let mut ages = Vec::new();
        while let Some(row) = stream.next().await.unwrap() {
            ages.push(row.get_value("age"));
        }

        assert_eq!(ages, vec![Value::Int(30), Value::Int(45), Value::Int(50)]);
        assert!(stream.is_finished());
        assert_eq!(stream.rows_read(), 3);
        assert_eq!(source.stats().closed(), 1);

        // Not restartable: the released cursor is never reopened.
        assert!(stream.next().await.unwrap().is_none());
        assert_eq!(source.stats().opened(), 1);
    }

    #[tokio::test]
    async fn test_empty_table_yields_nothing() {
        let source = MemoryRowSource::new("users", Vec::new());
        let mut stream = RowStream::open(&source, &query()).await.unwrap();

        assert!(stream.next().await.unwrap().is_none());
        assert_eq!(source.stats().open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_stream_releases_cursor() {
        let source = MemoryRowSource::new("users", users(&[30, 45, 50]));
        {
            let mut stream = RowStream::open(&source, &query()).await.unwrap();
            assert!(stream.next().await.unwrap().is_some());
            assert_eq!(source.stats().open_cursors(), 1);
        }
        assert_eq!(source.stats().open_cursors(), 0);
        assert_eq!(source.stats().closed(), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_is_surfaced_once_and_closes() {
        let source = MemoryRowSource::new("users", users(&[30, 45, 50])).with_faults(Faults {
            fail_after: Some(2),
            ..Faults::default()
        });
        let mut stream = RowStream::open(&source, &query()).await.unwrap();

        assert!(stream.next().await.unwrap().is_some());
        assert!(stream.next().await.unwrap().is_some());
        assert!(matches!(
            stream.next().await,
            Err(StreamError::Fetch { rows_read: 2, .. })
        ));
        assert!(stream.is_finished());
        assert!(stream.next().await.unwrap().is_none());
        assert_eq!(source.stats().closed(), 1);
    }

    #[tokio::test]
    async fn test_open_failures_are_typed() {
        let down = MemoryRowSource::new("users", users(&[1])).with_faults(Faults {
            unreachable: true,
            ..Faults::default()
        });
        assert!(matches!(
            RowStream::open(&down, &query()).await,
            Err(StreamError::Connection { .. })
        ));

        let strict = MemoryRowSource::new("users", users(&[1])).with_faults(Faults {
            reject_sql_containing: Some("user_data".into()),
            ..Faults::default()
        });
        assert!(matches!(
            RowStream::open(&strict, &query()).await,
            Err(StreamError::Query { .. })
        ));
    }

    #[tokio::test]
    async fn test_into_stream_collects() {
        let source = MemoryRowSource::new("users", users(&[30, 45]));
        let stream = RowStream::open(&source, &query()).await.unwrap();

        let rows: Vec<RowData> = into_stream(stream).try_collect().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(source.stats().open_cursors(), 0);
    }
}
