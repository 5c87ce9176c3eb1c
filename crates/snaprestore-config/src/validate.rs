//! Path validation and document field parsing.
//!
//! Paths are validated before any filesystem access: a path that mixes both
//! separator styles is ambiguous and is rejected rather than guessed at.

use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::model::PathConvention;

/// Normalize a configured path to the convention's native separator.
///
/// # Errors
///
/// Returns [`ConfigError::EmptyPath`] for blank input and
/// [`ConfigError::MalformedPath`] when both `/` and `\` appear in `raw`.
pub fn normalize_path(
    field: &'static str,
    raw: &str,
    convention: PathConvention,
) -> ConfigResult<String> {
    if raw.trim().is_empty() {
        return Err(ConfigError::EmptyPath { field });
    }
    if raw.contains('/') && raw.contains('\\') {
        return Err(ConfigError::MalformedPath {
            field,
            value: raw.to_string(),
        });
    }

    Ok(match convention {
        PathConvention::Windows => raw.replace('/', "\\"),
        PathConvention::Posix => raw.to_string(),
    })
}

/// Normalize a path that must reference a raw volume or device.
///
/// # Errors
///
/// Returns the errors of [`normalize_path`], plus [`ConfigError::NotADevicePath`]
/// when the normalized path lacks the convention's device prefix.
pub fn normalize_device_path(
    field: &'static str,
    raw: &str,
    convention: PathConvention,
) -> ConfigResult<String> {
    let normalized = normalize_path(field, raw, convention)?;
    let prefix = convention.device_prefix();
    if !normalized.starts_with(prefix) {
        return Err(ConfigError::NotADevicePath {
            field,
            value: normalized,
            prefix,
        });
    }
    Ok(normalized)
}

pub(crate) fn required_str<'a>(
    document: &'a Map<String, Value>,
    field: &'static str,
) -> ConfigResult<&'a str> {
    match document.get(field) {
        None | Some(Value::Null) => Err(ConfigError::invalid_field(field, None, "is required")),
        Some(Value::String(value)) => Ok(value),
        Some(other) => Err(ConfigError::invalid_field(
            field,
            Some(other),
            "must be a string",
        )),
    }
}

pub(crate) fn optional_bool(
    document: &Map<String, Value>,
    field: &'static str,
) -> ConfigResult<Option<bool>> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(other) => Err(ConfigError::invalid_field(
            field,
            Some(other),
            "must be a boolean",
        )),
    }
}

pub(crate) fn optional_u64(
    document: &Map<String, Value>,
    field: &'static str,
) -> ConfigResult<Option<u64>> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            ConfigError::invalid_field(field, Some(value), "must be a non-negative integer")
        }),
    }
}

pub(crate) fn optional_attempts(
    document: &Map<String, Value>,
    field: &'static str,
) -> ConfigResult<Option<u32>> {
    let Some(raw) = optional_u64(document, field)? else {
        return Ok(None);
    };
    let value = document.get(field);
    let attempts = u32::try_from(raw)
        .map_err(|_| ConfigError::invalid_field(field, value, "must fit in 32 bits"))?;
    if attempts == 0 {
        return Err(ConfigError::invalid_field(field, value, "must be at least 1"));
    }
    Ok(Some(attempts))
}

pub(crate) fn optional_convention(
    document: &Map<String, Value>,
    field: &'static str,
) -> ConfigResult<Option<PathConvention>> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => value.parse().map(Some),
        Some(other) => Err(ConfigError::invalid_field(
            field,
            Some(other),
            "must be a string",
        )),
    }
}
