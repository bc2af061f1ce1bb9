use serde::{Deserialize, Deserializer};

use crate::error::ApiError;

/// Trimmed, non-empty text no longer than `max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_field(field, "must not be empty"));
    }
    if trimmed.chars().count() > max {
        return Err(ApiError::invalid_field(field, format!("must be at most {} characters", max)));
    }
    Ok(trimmed.to_string())
}

/// Like `required_text` but blank input becomes `None`.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, ApiError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(field, v, max).map(Some),
    }
}

pub const NAME_MAX: usize = 100;
pub const TEXT_MAX: usize = 10_000;

/// Distinguish an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in partial updates. Pair with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
