use crate::error::StreamError;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config, NoTls};
use tracing::error;

/// Opens one connection and spawns the task that drives it. Aborting the
/// returned handle tears the connection down.
pub(crate) async fn connect_client(
    config: &Config,
    target: &str,
) -> Result<(Client, JoinHandle<()>), StreamError> {
    let (client, connection) = config
        .connect(NoTls)
        .await
        .map_err(|e| StreamError::connection(target, e))?;

    let handle = tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "Postgres connection error");
        }
    });

    Ok((client, handle))
}

/// `user@host:port/db` for logs and error messages; never includes the password.
pub(crate) fn describe_config(config: &Config) -> String {
    let user = config.get_user().unwrap_or("postgres");
    let host = config
        .get_hosts()
        .first()
        .map(|host| match host {
            tokio_postgres::config::Host::Tcp(name) => name.clone(),
            #[cfg(unix)]
            tokio_postgres::config::Host::Unix(path) => path.display().to_string(),
        })
        .unwrap_or_else(|| "localhost".to_string());
    let port = config.get_ports().first().copied().unwrap_or(5432);
    let db = config.get_dbname().unwrap_or(user);
    format!("{user}@{host}:{port}/{db}")
}

/// Splits a driver error into "the store rejected the query" and "the
/// connection is gone".
pub(crate) fn classify_open_error(target: &str, sql: &str, err: tokio_postgres::Error) -> StreamError {
    if err.is_closed() {
        StreamError::connection(target, err)
    } else {
        StreamError::query(sql, err)
    }
}
