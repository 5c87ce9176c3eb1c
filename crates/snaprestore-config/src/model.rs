//! Typed restore configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_VERIFY_ATTEMPTS, DEFAULT_VERIFY_DELAY_MS, MOUNT_PATH_FIELD, PATH_CONVENTION_FIELD,
    SHADOW_PATH_FIELD, TARGET_PATH_FIELD,
};
use crate::error::{ConfigError, ConfigResult};
use crate::validate::{normalize_device_path, normalize_path};

/// Path syntax used to interpret configured paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathConvention {
    /// Backslash separators; devices are addressed as `\\?\...`.
    Windows,
    /// Forward-slash separators; devices live under `/dev/`.
    Posix,
}

impl PathConvention {
    /// Convention of the platform this binary was built for.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    /// Native separator for this convention.
    #[must_use]
    pub const fn separator(self) -> char {
        match self {
            Self::Windows => '\\',
            Self::Posix => '/',
        }
    }

    /// Prefix that marks a path as a raw volume or device reference.
    #[must_use]
    pub const fn device_prefix(self) -> &'static str {
        match self {
            Self::Windows => r"\\?\",
            Self::Posix => "/dev/",
        }
    }

    /// Stable string form used in documents and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Posix => "posix",
        }
    }
}

impl Default for PathConvention {
    fn default() -> Self {
        Self::native()
    }
}

impl FromStr for PathConvention {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "windows" => Ok(Self::Windows),
            "posix" => Ok(Self::Posix),
            other => Err(ConfigError::InvalidField {
                field: PATH_CONVENTION_FIELD,
                value: Some(other.to_string()),
                reason: "must be 'windows' or 'posix'",
            }),
        }
    }
}

/// Behavioural switches for a restore run.
///
/// The defaults reproduce the plain mount, verify and copy sequence: no capacity
/// check, the mount is left in place, five verification attempts 500ms apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestoreOptions {
    /// Refuse to copy when the target volume lacks room for the snapshot contents.
    pub check_capacity: bool,
    /// Remove the mount link once the copy has completed successfully.
    pub unmount_on_success: bool,
    /// Number of enumeration attempts made while verifying the mount.
    pub verify_attempts: u32,
    /// Pause between verification attempts.
    pub verify_delay: Duration,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            check_capacity: false,
            unmount_on_success: false,
            verify_attempts: DEFAULT_VERIFY_ATTEMPTS,
            verify_delay: Duration::from_millis(DEFAULT_VERIFY_DELAY_MS),
        }
    }
}

/// Validated, immutable description of a single restore run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreConfig {
    snapshot_source_path: PathBuf,
    target_path: PathBuf,
    mount_path: PathBuf,
    convention: PathConvention,
    options: RestoreOptions,
}

impl RestoreConfig {
    /// Validate the three raw paths and build a configuration with default options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPath`], [`ConfigError::MalformedPath`] or
    /// [`ConfigError::NotADevicePath`] when a path fails validation.
    pub fn new(
        snapshot_source: &str,
        target: &str,
        mount: &str,
        convention: PathConvention,
    ) -> ConfigResult<Self> {
        Ok(Self {
            snapshot_source_path: PathBuf::from(normalize_device_path(
                SHADOW_PATH_FIELD,
                snapshot_source,
                convention,
            )?),
            target_path: PathBuf::from(normalize_path(TARGET_PATH_FIELD, target, convention)?),
            mount_path: PathBuf::from(normalize_path(MOUNT_PATH_FIELD, mount, convention)?),
            convention,
            options: RestoreOptions::default(),
        })
    }

    /// Replace the run options.
    #[must_use]
    pub fn with_options(mut self, options: RestoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Device path of the snapshot to restore from.
    #[must_use]
    pub fn snapshot_source_path(&self) -> &Path {
        &self.snapshot_source_path
    }

    /// Directory receiving the restored tree.
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Location of the directory link exposing the snapshot.
    #[must_use]
    pub fn mount_path(&self) -> &Path {
        &self.mount_path
    }

    /// Path convention the paths were validated against.
    #[must_use]
    pub const fn convention(&self) -> PathConvention {
        self.convention
    }

    /// Run options.
    #[must_use]
    pub const fn options(&self) -> &RestoreOptions {
        &self.options
    }
}
