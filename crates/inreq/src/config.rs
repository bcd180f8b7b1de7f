//! Decoder configuration.
//!
//! Decoder-level defaults can be loaded from TOML instead of being set in
//! code. Path lookups, custom operations, content decoders and field-name
//! mappers have no file representation and stay code-only.
//!
//! ```toml
//! operations = ["query", "header", "body"]
//! default_required = false
//! slice_split_separator = ";"
//! ensure_all_query_used = true
//! max_body_size = 1048576
//! ```

use crate::context::{DEFAULT_MAX_BODY_SIZE, DEFAULT_SEPARATOR};
use crate::operation::{BODY, FORM, HEADER, PATH, QUERY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const BUILTIN_OPERATIONS: [&str; 5] = [QUERY, PATH, HEADER, FORM, BODY];

/// Errors raised while loading or validating a [`DecoderConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Invalid configuration value.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field with the invalid value.
        field: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },
}

/// Decoder-level defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DecoderConfig {
    /// Built-in operations to register.
    #[serde(default = "default_operations")]
    pub operations: Vec<String>,

    /// Whether fields are required unless declared otherwise.
    #[serde(default = "default_true")]
    pub default_required: bool,

    /// Separator used to split a single value into a list.
    #[serde(default = "default_separator")]
    pub slice_split_separator: String,

    /// Whether operations may read the body.
    #[serde(default = "default_true")]
    pub allow_read_body: bool,

    /// Whether every query parameter must be consumed.
    #[serde(default)]
    pub ensure_all_query_used: bool,

    /// Whether every form value must be consumed.
    #[serde(default)]
    pub ensure_all_form_used: bool,

    /// Whether resolved struct descriptors are cached.
    #[serde(default)]
    pub struct_info_cache: bool,

    /// Largest body read, in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            operations: default_operations(),
            default_required: true,
            slice_split_separator: default_separator(),
            allow_read_body: true,
            ensure_all_query_used: false,
            ensure_all_form_used: false,
            struct_info_cache: false,
            max_body_size: default_max_body_size(),
        }
    }
}

impl DecoderConfig {
    /// Parses a configuration from TOML.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Reads a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading decoder configuration");
        Self::from_toml_str(&content)
    }

    /// Checks the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slice_split_separator.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "slice_split_separator".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(unknown) = self
            .operations
            .iter()
            .find(|name| !BUILTIN_OPERATIONS.contains(&name.as_str()))
        {
            return Err(ConfigError::InvalidValue {
                field: "operations".to_string(),
                reason: format!("unknown operation '{unknown}'"),
            });
        }
        if self.max_body_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_body_size".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn default_operations() -> Vec<String> {
    BUILTIN_OPERATIONS.iter().map(|name| (*name).to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = DecoderConfig::from_toml_str("").unwrap();
        assert_eq!(config, DecoderConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_values() {
        let config = DecoderConfig::from_toml_str(
            r#"
            operations = ["query", "body"]
            default_required = false
            slice_split_separator = ";"
            ensure_all_form_used = true
            max_body_size = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.operations, vec!["query", "body"]);
        assert!(!config.default_required);
        assert_eq!(config.slice_split_separator, ";");
        assert!(config.ensure_all_form_used);
        assert!(!config.ensure_all_query_used);
        assert_eq!(config.max_body_size, 1024);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = DecoderConfig::from_toml_str("tag_name = \"json\"");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_validate_unknown_operation() {
        let config = DecoderConfig {
            operations: vec!["query".to_string(), "cookie".to_string()],
            ..DecoderConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cookie"));
    }

    #[test]
    fn test_validate_empty_separator() {
        let config = DecoderConfig {
            slice_split_separator: String::new(),
            ..DecoderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "slice_split_separator"
        ));
    }

    #[test]
    fn test_validate_zero_body_limit() {
        let config = DecoderConfig {
            max_body_size: 0,
            ..DecoderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "allow_read_body = false").unwrap();

        let config = DecoderConfig::from_file(file.path()).unwrap();
        assert!(!config.allow_read_body);
    }

    #[test]
    fn test_from_missing_file() {
        let result = DecoderConfig::from_file("/nonexistent/inreq.toml");
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
