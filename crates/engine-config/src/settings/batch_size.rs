use crate::error::ConfigError;
use std::num::NonZeroUsize;

/// Rows per batch emitted by a batch stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSizeSetting(NonZeroUsize);

impl BatchSizeSetting {
    pub const DEFAULT: usize = 50;

    pub fn new(value: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(value)
            .map(BatchSizeSetting)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "batch size".to_string(),
                message: "must be at least 1".to_string(),
            })
    }

    pub fn parse(key: &str, raw: &str) -> Result<Self, ConfigError> {
        let value = raw
            .trim()
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("'{raw}' is not a positive integer: {e}"),
            })?;
        Self::new(value).map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be at least 1".to_string(),
        })
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

impl Default for BatchSizeSetting {
    fn default() -> Self {
        BatchSizeSetting(NonZeroUsize::new(Self::DEFAULT).unwrap_or(NonZeroUsize::MIN))
    }
}
