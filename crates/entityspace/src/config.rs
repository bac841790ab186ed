use entityspace_core::config::CoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

///
/// SessionConfig
///
/// Session policy. Missing keys fall back to their defaults:
///
/// ```toml
/// strict_merge = false
/// debug = false
///
/// [core]
/// max_expansion_depth = 32
/// ```
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Abort a merge on the first malformed item instead of skipping it.
    pub strict_merge: bool,

    /// Narrate cache hit/miss decisions at `debug` level.
    pub debug: bool,

    pub core: CoreConfig,
}

impl SessionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;

        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.core.max_expansion_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "core.max_expansion_depth",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SessionConfig::from_toml_str("").unwrap();

        assert_eq!(config, SessionConfig::default());
        assert!(!config.strict_merge);
        assert_eq!(
            config.core.max_expansion_depth,
            CoreConfig::DEFAULT_MAX_EXPANSION_DEPTH
        );
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = SessionConfig::from_toml_str(
            r"
            strict_merge = true

            [core]
            max_expansion_depth = 4
            ",
        )
        .unwrap();

        assert!(config.strict_merge);
        assert!(!config.debug);
        assert_eq!(config.core.max_expansion_depth, 4);
    }

    #[test]
    fn zero_depth_is_rejected() {
        let err = SessionConfig::from_toml_str("[core]\nmax_expansion_depth = 0").unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "core.max_expansion_depth",
                ..
            }
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = SessionConfig::from_toml_str("strict_merge = ").unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
