//! # Design
//!
//! - Provide structured errors for the mount, precondition, and copy phases.
//! - Capture operation context (paths, attempts, sizes) so failures are reproducible in tests.
//! - Preserve the platform error as `source`; never interpret raw codes beyond logging them.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for restore operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced while mounting a snapshot and copying it out.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// The mount point is a directory with content; it is never cleared implicitly.
    #[error("mount path '{}' is not empty; clear it manually", path.display())]
    MountPathNotEmpty {
        /// Occupied mount point.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Clearing a stale mount or creating the directory link failed.
    #[error("failed to create mount at '{}'", path.display())]
    MountCreationFailed {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Mount point involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The mount never became enumerable.
    #[error("failed to verify mount '{}' after {attempts} attempts", path.display())]
    MountVerificationFailed {
        /// Mount point that could not be enumerated.
        path: PathBuf,
        /// Number of enumeration attempts made.
        attempts: u32,
        /// Error returned by the last attempt.
        source: io::Error,
    },
    /// The restore target is missing or is not a directory.
    #[error("restore target '{}' is not an existing directory", path.display())]
    PreconditionFailed {
        /// Target path that failed the check.
        path: PathBuf,
        /// Probe error when the target could not be inspected.
        source: Option<io::Error>,
    },
    /// Querying free space on the target volume failed.
    #[error("failed to query free space for '{}'", path.display())]
    SpaceQuery {
        /// Path whose volume was queried.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The target volume lacks room for the snapshot contents.
    #[error(
        "restore target '{}' has {available} bytes available but {required} are required",
        path.display()
    )]
    InsufficientSpace {
        /// Target directory.
        path: PathBuf,
        /// Bytes the copy would write.
        required: u64,
        /// Bytes available on the target volume.
        available: u64,
    },
    /// A directory creation, enumeration, or file copy failed during traversal.
    #[error("copy failed at '{}'", path.display())]
    CopyFailed {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Offending path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Removing the mount after a restore failed.
    #[error("failed to remove mount '{}': {reason}", path.display())]
    Unmount {
        /// Mount point.
        path: PathBuf,
        /// Static reason for the failure.
        reason: &'static str,
        /// Underlying IO error when one was raised.
        source: Option<io::Error>,
    },
}

impl FsOpsError {
    pub(crate) fn copy(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::CopyFailed {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn mount(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::MountCreationFailed {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Render the error followed by its source chain, `: `-separated.
    #[must_use]
    pub fn detail(&self) -> String {
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
