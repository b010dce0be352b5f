use crate::{
    error::StreamError,
    sql::{
        base::{
            query::Query,
            source::{RowCursor, RowSource},
        },
        postgres::{
            params::PgParamStore,
            row::to_row_data,
            utils::{classify_open_error, connect_client, describe_config},
        },
    },
};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use model::records::row::RowData;
use std::pin::Pin;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config, RowStream};
use tracing::{debug, info};

/// Postgres-backed row source. Every `open` gets its own connection; nothing
/// is pooled or shared between cursors.
#[derive(Clone)]
pub struct PgRowSource {
    config: Config,
    target: String,
}

impl PgRowSource {
    /// Parses `url` without connecting.
    pub fn new(url: &str) -> Result<Self, StreamError> {
        let config = url
            .parse::<Config>()
            .map_err(|e| StreamError::invalid_argument(format!("invalid Postgres URL: {e}")))?;
        let target = describe_config(&config);
        Ok(PgRowSource { config, target })
    }

    /// A dedicated connection for statements that are not row scans
    /// (schema setup and seeding).
    pub async fn connect(&self) -> Result<PgConnection, StreamError> {
        let (client, handle) = connect_client(&self.config, &self.target).await?;
        Ok(PgConnection {
            client,
            handle,
            target: self.target.clone(),
        })
    }
}

#[async_trait]
impl RowSource for PgRowSource {
    async fn open(&self, query: &Query) -> Result<Box<dyn RowCursor>, StreamError> {
        let (sql, params) = query.to_postgres()?;
        info!(target_db = %self.target, %sql, ?params, "Executing query");

        let (client, handle) = connect_client(&self.config, &self.target).await?;
        // From here on the cursor owns the connection, so an early return
        // below releases it through Drop.
        let mut cursor = PgCursor {
            stream: None,
            client: Some(client),
            connection: Some(handle),
            entity: query.entity.clone(),
            rows_read: 0,
            closed: false,
        };

        let bindings = PgParamStore::from_values(params);
        let stream = match cursor.client.as_ref() {
            Some(client) => client
                .query_raw(sql.as_str(), bindings.as_refs())
                .await
                .map_err(|e| classify_open_error(&self.target, &sql, e))?,
            None => return Err(StreamError::connection(&self.target, "client released")),
        };
        cursor.stream = Some(Box::pin(stream));

        Ok(Box::new(cursor))
    }

    fn describe(&self) -> String {
        format!("postgres://{}", self.target)
    }
}

pub struct PgCursor {
    stream: Option<Pin<Box<RowStream>>>,
    client: Option<Client>,
    connection: Option<JoinHandle<()>>,
    entity: String,
    rows_read: usize,
    closed: bool,
}

#[async_trait]
impl RowCursor for PgCursor {
    async fn next(&mut self) -> Result<Option<RowData>, StreamError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        let row = match stream.try_next().await {
            Ok(Some(row)) => row,
            Ok(None) => {
                self.close();
                return Ok(None);
            }
            Err(err) => {
                let rows_read = self.rows_read;
                self.close();
                return Err(StreamError::fetch(rows_read, err));
            }
        };

        match to_row_data(&row, &self.entity) {
            Ok(data) => {
                self.rows_read += 1;
                Ok(Some(data))
            }
            Err(err) => {
                let rows_read = self.rows_read;
                self.close();
                Err(StreamError::fetch(rows_read, err))
            }
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.stream.take();
        self.client.take();
        if let Some(handle) = self.connection.take() {
            handle.abort();
        }

        debug!(entity = %self.entity, rows_read = self.rows_read, "Cursor closed");
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for PgCursor {
    fn drop(&mut self) {
        self.close();
    }
}

/// A plain connection for non-streaming statements. Dropping it closes the
/// connection.
pub struct PgConnection {
    client: Client,
    handle: JoinHandle<()>,
    target: String,
}

impl PgConnection {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
