use connectors::error::StreamError;
use engine_config::error::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("Invalid connection URL '{0}': expected postgres://... or memory:<csv path>")]
    InvalidConnectionUrl(String),

    #[error("The {0} command needs a Postgres connection")]
    PostgresRequired(&'static str),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Shutdown requested")]
    ShutdownRequested,
}
