use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use snaprestore_config::defaults::{MOUNT_PATH_FIELD, SHADOW_PATH_FIELD, TARGET_PATH_FIELD};
use snaprestore_config::{ConfigError, ConfigLoader, PathConvention};

fn windows_document() -> serde_json::Value {
    json!({
        "shadowPath": r"\\?\Volume{3f1e2d4c-9a7b-4c1d-8e2f-5a6b7c8d9e0f}\",
        "targetPath": "D:/Restore",
        "mountPath": r"C:\Mnt",
        "pathConvention": "windows",
        "comment": "unknown keys are ignored"
    })
}

#[test]
fn windows_document_loads_from_disk_and_normalizes_paths() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    fs::write(&path, serde_json::to_vec_pretty(&windows_document())?)?;

    let config = ConfigLoader::new().load(&path)?;

    assert_eq!(config.convention(), PathConvention::Windows);
    assert_eq!(
        config.snapshot_source_path(),
        Path::new(r"\\?\Volume{3f1e2d4c-9a7b-4c1d-8e2f-5a6b7c8d9e0f}\")
    );
    assert_eq!(config.target_path(), Path::new(r"D:\Restore"));
    assert_eq!(config.mount_path(), Path::new(r"C:\Mnt"));
    assert_eq!(config.options().verify_attempts, 5);
    assert_eq!(config.options().verify_delay, Duration::from_millis(500));
    assert!(!config.options().check_capacity);
    assert!(!config.options().unmount_on_success);
    Ok(())
}

#[test]
fn mixed_separators_are_rejected_for_every_path_field() {
    for field in [SHADOW_PATH_FIELD, TARGET_PATH_FIELD, MOUNT_PATH_FIELD] {
        let mut document = windows_document();
        let replacement = if field == SHADOW_PATH_FIELD {
            r"\\?\Volume{1}/mixed"
        } else {
            r"C:/a\b"
        };
        document[field] = json!(replacement);

        let err = ConfigLoader::new()
            .parse(&document.to_string())
            .expect_err("mixed separators");

        assert!(
            matches!(err, ConfigError::MalformedPath { field: reported, .. } if reported == field),
            "{field}: {err}"
        );
    }
}

#[test]
fn forced_convention_overrides_document() {
    let err = ConfigLoader::new()
        .with_convention(PathConvention::Posix)
        .parse(&windows_document().to_string())
        .expect_err("windows device path under posix rules");

    assert!(matches!(
        err,
        ConfigError::NotADevicePath {
            prefix: "/dev/",
            ..
        }
    ));
}

#[test]
fn optional_settings_flow_into_options() -> Result<()> {
    let mut document = windows_document();
    document["checkCapacity"] = json!(true);
    document["unmountOnSuccess"] = json!(true);
    document["verifyAttempts"] = json!(2);
    document["verifyDelayMs"] = json!(0);

    let config = ConfigLoader::new().parse(&document.to_string())?;

    assert!(config.options().check_capacity);
    assert!(config.options().unmount_on_success);
    assert_eq!(config.options().verify_attempts, 2);
    assert_eq!(config.options().verify_delay, Duration::ZERO);
    Ok(())
}

#[test]
fn wrong_typed_option_names_the_field() {
    let mut document = windows_document();
    document["verifyAttempts"] = json!("many");

    let err = ConfigLoader::new()
        .parse(&document.to_string())
        .expect_err("string attempts");

    assert!(matches!(
        err,
        ConfigError::InvalidField {
            field: "verifyAttempts",
            ..
        }
    ));
}

#[test]
fn missing_file_reports_io_error() {
    let err = ConfigLoader::new()
        .load(Path::new("/nonexistent/snaprestore/config.json"))
        .expect_err("missing file");

    assert!(matches!(err, ConfigError::Io { .. }));
}
