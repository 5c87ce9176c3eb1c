//! Error types for configuration loading and path validation.
//!
//! # Design
//! - One variant per failure kind so callers can match without string parsing.
//! - Carry the offending field and value; the message names both so operators can fix the document.
//! - Preserve IO and JSON sources for the full error chain.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration document failed.
    #[error("failed to read configuration file '{}'", path.display())]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path of the configuration document.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The configuration document was not valid JSON.
    #[error("failed to parse configuration document from {origin}")]
    Parse {
        /// Where the document came from (file path or inline source).
        origin: String,
        /// Source JSON error.
        source: serde_json::Error,
    },
    /// A field was missing or carried a value of the wrong type.
    #[error("invalid value for '{field}': {reason}")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A configured path was empty.
    #[error("path for '{field}' must not be empty")]
    EmptyPath {
        /// Field holding the empty path.
        field: &'static str,
    },
    /// A configured path mixed both separator styles.
    #[error("path for '{field}' mixes '/' and '\\' separators: {value}")]
    MalformedPath {
        /// Field holding the malformed path.
        field: &'static str,
        /// Raw path as supplied.
        value: String,
    },
    /// The snapshot source did not carry the device-path prefix.
    #[error("path for '{field}' must start with '{prefix}': {value}")]
    NotADevicePath {
        /// Field holding the offending path.
        field: &'static str,
        /// Normalized path that was rejected.
        value: String,
        /// Prefix the path was expected to start with.
        prefix: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid_field(
        field: &'static str,
        value: Option<&serde_json::Value>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            field,
            value: value.map(ToString::to_string),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::error::Error as _;

    #[test]
    fn messages_name_the_offending_field() {
        let err = ConfigError::MalformedPath {
            field: "mountPath",
            value: "C:/a\\b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "path for 'mountPath' mixes '/' and '\\' separators: C:/a\\b"
        );

        let err = ConfigError::invalid_field("targetPath", Some(&json!(7)), "must be a string");
        assert_eq!(
            err.to_string(),
            "invalid value for 'targetPath': must be a string"
        );
        assert!(matches!(
            err,
            ConfigError::InvalidField { value: Some(ref v), .. } if v == "7"
        ));
    }

    #[test]
    fn io_error_keeps_source() {
        let err = ConfigError::Io {
            operation: "config.read",
            path: PathBuf::from("config.json"),
            source: io::Error::other("denied"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("config.json"));
    }
}
