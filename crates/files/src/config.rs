//! Upload configuration.
//!
//! [`UploadConfig`] is resolved once, typically at process startup, and passed by
//! reference into every upload call. It is never mutated afterwards, so a single value
//! can be shared by any number of concurrent requests.

use crate::constants::DEFAULT_MAX_TOTAL_BYTES;
use crate::{UploadError, UploadResult};

/// Limits applied to one upload request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadConfig {
    max_total_bytes: u64,
    allowed_content_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            allowed_content_types: Vec::new(),
        }
    }
}

impl UploadConfig {
    /// Creates a configuration.
    ///
    /// A `max_total_bytes` of `None` or zero selects [`DEFAULT_MAX_TOTAL_BYTES`]. An
    /// empty allow-list accepts every media type.
    pub fn new(max_total_bytes: Option<u64>, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_total_bytes: max_total_bytes
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_TOTAL_BYTES),
            allowed_content_types,
        }
    }

    /// Replaces the total body size limit.
    #[must_use]
    pub fn with_max_total_bytes(self, max_total_bytes: u64) -> Self {
        Self::new(Some(max_total_bytes), self.allowed_content_types)
    }

    /// Replaces the allow-list.
    #[must_use]
    pub fn with_allowed_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_content_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_total_bytes(&self) -> u64 {
        self.max_total_bytes
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.allowed_content_types
    }

    /// Returns whether a sniffed media type passes the allow-list.
    ///
    /// Comparison ignores ASCII case. An entry matches either the full sniffed value
    /// (`text/plain; charset=utf-8`) or its essence without parameters (`text/plain`).
    pub fn allows(&self, media_type: &str) -> bool {
        if self.allowed_content_types.is_empty() {
            return true;
        }

        let essence = media_type.split(';').next().unwrap_or(media_type).trim();
        self.allowed_content_types.iter().any(|allowed| {
            let allowed = allowed.trim();
            allowed.eq_ignore_ascii_case(media_type) || allowed.eq_ignore_ascii_case(essence)
        })
    }
}

/// Parse the total upload size limit from an optional string value.
///
/// `None` or an empty/whitespace value selects the default.
pub fn max_bytes_from_env_value(value: Option<String>) -> UploadResult<u64> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_MAX_TOTAL_BYTES),
        Some(v) => v
            .parse::<u64>()
            .map_err(|e| UploadError::InvalidConfig(format!("invalid byte limit {v:?}: {e}"))),
    }
}

/// Parse a comma-separated allow-list from an optional string value.
///
/// Blank entries are skipped; `None` yields an empty (unrestricted) list.
pub fn allowed_types_from_env_value(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse the default rename flag from an optional string value.
///
/// Accepts `true/false`, `1/0` and `yes/no` in any case. `None` or a blank value
/// selects `true`.
pub fn rename_from_env_value(value: Option<String>) -> UploadResult<bool> {
    let value = value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    match value.as_deref() {
        None => Ok(true),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(UploadError::InvalidConfig(format!(
            "invalid rename flag {other:?}"
        ))),
    }
}
