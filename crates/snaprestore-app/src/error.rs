//! # Design
//!
//! - Centralize process-level errors for configuration, telemetry, and the restore run.
//! - Keep error messages constant while carrying the operation label and source.
//! - Map each failure class onto a stable process exit code.

use std::io;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Exit code for configuration failures.
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for restore failures.
pub const EXIT_RESTORE: i32 = 3;
/// Exit code for telemetry initialisation failures.
pub const EXIT_TELEMETRY: i32 = 4;
/// Exit code for failures rendering or writing the run summary.
pub const EXIT_OUTPUT: i32 = 1;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Loading or validating the configuration failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: snaprestore_config::ConfigError,
    },
    /// The restore run failed.
    #[error("restore operation failed")]
    Restore {
        /// Operation identifier.
        operation: &'static str,
        /// Source restore error.
        source: snaprestore_fsops::FsOpsError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: snaprestore_telemetry::TelemetryError,
    },
    /// Rendering the run summary failed.
    #[error("summary rendering failed")]
    Summary {
        /// Operation identifier.
        operation: &'static str,
        /// Source serialization error.
        source: serde_json::Error,
    },
    /// Writing the run summary failed.
    #[error("summary output failed")]
    Output {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: snaprestore_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn restore(
        operation: &'static str,
        source: snaprestore_fsops::FsOpsError,
    ) -> Self {
        Self::Restore { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: snaprestore_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn summary(operation: &'static str, source: serde_json::Error) -> Self {
        Self::Summary { operation, source }
    }

    pub(crate) const fn output(operation: &'static str, source: io::Error) -> Self {
        Self::Output { operation, source }
    }

    /// Process exit code for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => EXIT_CONFIG,
            Self::Restore { .. } => EXIT_RESTORE,
            Self::Telemetry { .. } => EXIT_TELEMETRY,
            Self::Summary { .. } | Self::Output { .. } => EXIT_OUTPUT,
        }
    }

    /// Message shown to the operator: the error followed by its source chain.
    #[must_use]
    pub fn display_message(&self) -> String {
        let mut rendered = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(source) = current {
            rendered.push_str(": ");
            rendered.push_str(&source.to_string());
            current = source.source();
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::path::PathBuf;
    use tracing_subscriber::util::SubscriberInitExt;

    fn telemetry_error() -> snaprestore_telemetry::TelemetryError {
        let _ = tracing_subscriber::registry().try_init();
        match tracing_subscriber::registry().try_init() {
            Err(source) => snaprestore_telemetry::TelemetryError::SubscriberInstall { source },
            Ok(()) => panic!("second subscriber install must fail"),
        }
    }

    #[test]
    fn exit_codes_follow_failure_class() {
        let config = AppError::config(
            "config.load",
            snaprestore_config::ConfigError::EmptyPath { field: "mountPath" },
        );
        assert_eq!(config.exit_code(), EXIT_CONFIG);

        let restore = AppError::restore(
            "restore.run",
            snaprestore_fsops::FsOpsError::PreconditionFailed {
                path: PathBuf::from("D:/Restore"),
                source: None,
            },
        );
        assert_eq!(restore.exit_code(), EXIT_RESTORE);

        let telemetry = AppError::telemetry("telemetry.init", telemetry_error());
        assert_eq!(telemetry.exit_code(), EXIT_TELEMETRY);
        assert!(telemetry.source().is_some());
    }

    #[test]
    fn display_message_includes_platform_text() {
        let err = AppError::restore(
            "restore.run",
            snaprestore_fsops::FsOpsError::MountCreationFailed {
                operation: "mount.create_link",
                path: PathBuf::from("C:/Mnt"),
                source: io::Error::other("A required privilege is not held by the client."),
            },
        );
        assert_eq!(
            err.display_message(),
            "restore operation failed: failed to create mount at 'C:/Mnt': A required privilege is not held by the client."
        );
    }
}
