use crate::error::ConfigError;
use std::num::NonZeroUsize;

/// Rows requested per `LIMIT/OFFSET` page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizeSetting(NonZeroUsize);

impl PageSizeSetting {
    pub const DEFAULT: usize = 100;

    pub fn new(value: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(value)
            .map(PageSizeSetting)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "page size".to_string(),
                message: "must be at least 1".to_string(),
            })
    }

    pub fn parse(key: &str, raw: &str) -> Result<Self, ConfigError> {
        raw.trim()
            .parse::<usize>()
            .ok()
            .and_then(NonZeroUsize::new)
            .map(PageSizeSetting)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("'{raw}' is not a positive integer"),
            })
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

impl Default for PageSizeSetting {
    fn default() -> Self {
        PageSizeSetting(NonZeroUsize::new(Self::DEFAULT).unwrap_or(NonZeroUsize::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(PageSizeSetting::parse("k", "2").unwrap().get(), 2);
        assert!(PageSizeSetting::parse("k", "0").is_err());
        assert!(PageSizeSetting::parse("k", "ten").is_err());
        assert_eq!(PageSizeSetting::default().get(), 100);
    }
}
