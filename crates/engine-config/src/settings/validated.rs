use crate::{
    env::EnvManager,
    error::ConfigError,
    settings::{
        ENV_BATCH_SIZE, ENV_DATABASE_URL, ENV_KEY_COLUMN, ENV_PAGE_SIZE, ENV_TABLE,
        batch_size::BatchSizeSetting, page_size::PageSizeSetting,
    },
};
use tracing::debug;

pub const DEFAULT_TABLE: &str = "user_data";
pub const DEFAULT_KEY_COLUMN: &str = "user_id";

/// Immutable, validated configuration shared by every stream command.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSettings {
    /// `postgres://…` or `memory:<csv path>`
    pub database_url: String,
    /// Table scanned by the streams
    pub table: String,
    /// Unique column used to order paginated scans
    pub key_column: String,
    pub batch_size: usize,
    pub page_size: usize,
}

/// Collects overrides (typically from CLI flags) on top of the environment.
#[derive(Debug, Default)]
pub struct ValidatedSettingsBuilder {
    pub database_url: Option<String>,
    pub table: Option<String>,
    pub key_column: Option<String>,
    pub batch_size: Option<usize>,
    pub page_size: Option<usize>,
}

impl ValidatedSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database_url(mut self, url: Option<String>) -> Self {
        self.database_url = url;
        self
    }

    pub fn table(mut self, table: Option<String>) -> Self {
        self.table = table;
        self
    }

    pub fn key_column(mut self, column: Option<String>) -> Self {
        self.key_column = column;
        self
    }

    pub fn batch_size(mut self, size: Option<usize>) -> Self {
        self.batch_size = size;
        self
    }

    pub fn page_size(mut self, size: Option<usize>) -> Self {
        self.page_size = size;
        self
    }

    /// Resolves every setting: explicit override first, then `env`, then the
    /// default. The database URL has no default.
    pub fn build(self, env: &EnvManager) -> Result<ValidatedSettings, ConfigError> {
        let database_url = self
            .database_url
            .or_else(|| env.get(ENV_DATABASE_URL).map(str::to_string))
            .ok_or_else(|| ConfigError::Missing(ENV_DATABASE_URL.to_string()))?;

        let table = self
            .table
            .or_else(|| env.get(ENV_TABLE).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());

        let key_column = self
            .key_column
            .or_else(|| env.get(ENV_KEY_COLUMN).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_KEY_COLUMN.to_string());

        let batch_size = match (self.batch_size, env.get(ENV_BATCH_SIZE)) {
            (Some(size), _) => BatchSizeSetting::new(size)?,
            (None, Some(raw)) => BatchSizeSetting::parse(ENV_BATCH_SIZE, raw)?,
            (None, None) => BatchSizeSetting::default(),
        };

        let page_size = match (self.page_size, env.get(ENV_PAGE_SIZE)) {
            (Some(size), _) => PageSizeSetting::new(size)?,
            (None, Some(raw)) => PageSizeSetting::parse(ENV_PAGE_SIZE, raw)?,
            (None, None) => PageSizeSetting::default(),
        };

        let settings = ValidatedSettings {
            database_url,
            table,
            key_column,
            batch_size: batch_size.get(),
            page_size: page_size.get(),
        };

        debug!(
            table = %settings.table,
            batch_size = settings.batch_size,
            page_size = settings.page_size,
            "Settings resolved"
        );
        Ok(settings)
    }
}
