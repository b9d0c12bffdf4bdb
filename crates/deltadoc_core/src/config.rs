//! Engine configuration.

use deltadoc_storage::WriteOptions;
use serde::{Deserialize, Serialize};

/// Configuration shared by every document created from a [`crate::Database`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Options passed with every store write.
    pub write_options: WriteOptions,

    /// Reject paths the model's schema does not declare.
    pub strict_schema: bool,

    /// Run filters and validation before create, save and update.
    pub validate_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write_options: WriteOptions::default(),
            strict_schema: true,
            validate_on_write: true,
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the options passed with every store write.
    #[must_use]
    pub const fn write_options(mut self, options: WriteOptions) -> Self {
        self.write_options = options;
        self
    }

    /// Sets whether undeclared paths are rejected.
    #[must_use]
    pub const fn strict_schema(mut self, value: bool) -> Self {
        self.strict_schema = value;
        self
    }

    /// Sets whether writes are gated by filters and validation.
    #[must_use]
    pub const fn validate_on_write(mut self, value: bool) -> Self {
        self.validate_on_write = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.strict_schema);
        assert!(config.validate_on_write);
        assert!(config.write_options.safe);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .strict_schema(false)
            .validate_on_write(false)
            .write_options(WriteOptions::default().timeout(Duration::from_secs(1)));
        assert!(!config.strict_schema);
        assert!(!config.validate_on_write);
        assert_eq!(config.write_options.timeout, Duration::from_secs(1));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: Config = serde_json::from_str(r#"{"strict_schema": false}"#).unwrap();
        assert!(!config.strict_schema);
        assert!(config.validate_on_write);
        assert_eq!(config.write_options, WriteOptions::default());
    }
}
