//! Loading restore configuration documents from disk.
//!
//! # Design
//! - The document is parsed as untyped JSON first so every missing or
//!   mistyped field is reported by name.
//! - A loader either returns a fully validated [`RestoreConfig`] or an error;
//!   nothing partially built escapes.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::defaults::{
    CHECK_CAPACITY_FIELD, MOUNT_PATH_FIELD, PATH_CONVENTION_FIELD, SHADOW_PATH_FIELD,
    TARGET_PATH_FIELD, UNMOUNT_ON_SUCCESS_FIELD, VERIFY_ATTEMPTS_FIELD, VERIFY_DELAY_MS_FIELD,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{PathConvention, RestoreConfig, RestoreOptions};
use crate::validate::{
    optional_attempts, optional_bool, optional_convention, optional_u64, required_str,
};

/// Reads restore configuration documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader {
    convention: Option<PathConvention>,
}

impl ConfigLoader {
    /// Loader that honours the document's `pathConvention`, falling back to the native one.
    #[must_use]
    pub const fn new() -> Self {
        Self { convention: None }
    }

    /// Force a path convention regardless of what the document declares.
    #[must_use]
    pub const fn with_convention(mut self, convention: PathConvention) -> Self {
        self.convention = Some(convention);
        self
    }

    /// Read and validate the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise the
    /// errors of [`ConfigLoader::parse`].
    pub fn load(&self, path: &Path) -> ConfigResult<RestoreConfig> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            operation: "config.read",
            path: path.to_path_buf(),
            source,
        })?;
        let config = self.parse_with_origin(&text, &path.display().to_string())?;
        debug!(
            path = %path.display(),
            source = %config.snapshot_source_path().display(),
            target = %config.target_path().display(),
            mount = %config.mount_path().display(),
            "restore configuration loaded"
        );
        Ok(config)
    }

    /// Validate an in-memory JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON,
    /// [`ConfigError::InvalidField`] for missing or mistyped fields, and the
    /// path validation errors of [`RestoreConfig::new`].
    pub fn parse(&self, text: &str) -> ConfigResult<RestoreConfig> {
        self.parse_with_origin(text, "inline document")
    }

    fn parse_with_origin(&self, text: &str, origin: &str) -> ConfigResult<RestoreConfig> {
        let document: Value = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        self.build(&document)
    }

    fn build(&self, document: &Value) -> ConfigResult<RestoreConfig> {
        let Value::Object(map) = document else {
            return Err(ConfigError::invalid_field(
                "document",
                Some(document),
                "must be a JSON object",
            ));
        };

        let shadow = required_str(map, SHADOW_PATH_FIELD)?;
        let target = required_str(map, TARGET_PATH_FIELD)?;
        let mount = required_str(map, MOUNT_PATH_FIELD)?;

        let convention = match self.convention {
            Some(forced) => forced,
            None => optional_convention(map, PATH_CONVENTION_FIELD)?.unwrap_or_default(),
        };

        let defaults = RestoreOptions::default();
        let options = RestoreOptions {
            check_capacity: optional_bool(map, CHECK_CAPACITY_FIELD)?
                .unwrap_or(defaults.check_capacity),
            unmount_on_success: optional_bool(map, UNMOUNT_ON_SUCCESS_FIELD)?
                .unwrap_or(defaults.unmount_on_success),
            verify_attempts: optional_attempts(map, VERIFY_ATTEMPTS_FIELD)?
                .unwrap_or(defaults.verify_attempts),
            verify_delay: optional_u64(map, VERIFY_DELAY_MS_FIELD)?
                .map_or(defaults.verify_delay, Duration::from_millis),
        };

        Ok(RestoreConfig::new(shadow, target, mount, convention)?.with_options(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::path::PathBuf;

    #[test]
    fn parse_accepts_minimal_document() -> Result<()> {
        let config = ConfigLoader::new()
            .with_convention(PathConvention::Windows)
            .parse(
                r#"{
                    "shadowPath": "\\\\?\\GLOBALROOT\\Device\\HarddiskVolumeShadowCopy3",
                    "targetPath": "D:/Restore",
                    "mountPath": "C:\\VSSMount"
                }"#,
            )?;
        assert_eq!(
            config.snapshot_source_path(),
            Path::new(r"\\?\GLOBALROOT\Device\HarddiskVolumeShadowCopy3")
        );
        assert_eq!(config.target_path(), Path::new(r"D:\Restore"));
        assert_eq!(config.mount_path(), Path::new(r"C:\VSSMount"));
        assert_eq!(config.options(), &RestoreOptions::default());
        Ok(())
    }

    #[test]
    fn parse_reads_optional_settings() -> Result<()> {
        let config = ConfigLoader::new().parse(
            r#"{
                "shadowPath": "/dev/mapper/vg0-snap",
                "targetPath": "/srv/restore",
                "mountPath": "/mnt/snap",
                "pathConvention": "posix",
                "checkCapacity": true,
                "unmountOnSuccess": true,
                "verifyAttempts": 2,
                "verifyDelayMs": 10
            }"#,
        )?;
        assert_eq!(config.convention(), PathConvention::Posix);
        let options = config.options();
        assert!(options.check_capacity);
        assert!(options.unmount_on_success);
        assert_eq!(options.verify_attempts, 2);
        assert_eq!(options.verify_delay, Duration::from_millis(10));
        Ok(())
    }

    #[test]
    fn parse_reports_missing_field_by_name() {
        let err = ConfigLoader::new()
            .parse(r#"{ "shadowPath": "/dev/sdb1", "mountPath": "/mnt/snap" }"#)
            .expect_err("targetPath is missing");
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: TARGET_PATH_FIELD,
                reason: "is required",
                ..
            }
        ));
    }

    #[test]
    fn parse_rejects_non_object_and_bad_json() {
        assert!(matches!(
            ConfigLoader::new().parse("[1, 2]"),
            Err(ConfigError::InvalidField { field: "document", .. })
        ));
        assert!(matches!(
            ConfigLoader::new().parse("{ not json"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn load_reports_unreadable_file() {
        let missing = PathBuf::from("definitely/missing/config.json");
        let err = ConfigLoader::new()
            .load(&missing)
            .expect_err("file does not exist");
        assert!(matches!(err, ConfigError::Io { ref path, .. } if *path == missing));
    }

    #[test]
    fn load_reads_document_from_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "shadowPath": "/dev/sdb1", "targetPath": "/srv/out", "mountPath": "/mnt/in" }"#,
        )?;
        let config = ConfigLoader::new()
            .with_convention(PathConvention::Posix)
            .load(&path)?;
        assert_eq!(config.mount_path(), Path::new("/mnt/in"));
        Ok(())
    }
}
