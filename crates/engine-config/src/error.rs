use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read env file {path}: {source}")]
    EnvFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid env file: {0}")]
    EnvFileFormat(String),

    #[error("Missing required setting: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}
