use crate::error::CliError;
use connectors::{
    file::csv::reader::read_users_file,
    memory::MemoryRowSource,
    sql::{base::source::RowSource, postgres::adapter::PgRowSource},
};
use std::{path::PathBuf, str::FromStr, sync::Arc};
use tracing::{error, info};
use uuid::Uuid;

/// Where the rows come from.
#[derive(Debug, PartialEq)]
pub enum ConnectionKind {
    Postgres(String),
    /// A users CSV loaded into an in-process table
    Memory(PathBuf),
}

impl FromStr for ConnectionKind {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("memory:") {
            if path.is_empty() {
                return Err(CliError::InvalidConnectionUrl(s.to_string()));
            }
            return Ok(ConnectionKind::Memory(PathBuf::from(path)));
        }

        match s.split_once("://") {
            Some(("postgres" | "postgresql", _)) => Ok(ConnectionKind::Postgres(s.to_string())),
            _ => Err(CliError::InvalidConnectionUrl(s.to_string())),
        }
    }
}

impl ConnectionKind {
    /// Builds the row source for `table`. Nothing is connected yet for
    /// Postgres; a memory source reads its CSV here.
    pub fn open_source(&self, table: &str) -> Result<Arc<dyn RowSource>, CliError> {
        match self {
            ConnectionKind::Postgres(url) => Ok(Arc::new(PgRowSource::new(url)?)),
            ConnectionKind::Memory(path) => {
                let rows = read_users_file(path)?
                    .iter()
                    .map(|user| user.to_row(table, Uuid::new_v4()))
                    .collect::<Vec<_>>();
                info!(path = %path.display(), rows = rows.len(), "Loaded in-memory table");
                Ok(Arc::new(MemoryRowSource::new(&path.display().to_string(), rows)))
            }
        }
    }
}

pub async fn ping(source: &dyn RowSource) -> Result<(), CliError> {
    info!("Pinging {}", source.describe());
    source.ping().await.map_err(|e| {
        error!("Ping to {} failed: {}", source.describe(), e);
        e
    })?;
    info!("Ping to {} succeeded", source.describe());
    Ok(())
}
