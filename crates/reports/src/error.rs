use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable code of a rejected export request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportErrorCode {
    /// The filter did not parse, or the remote validator rejected it.
    InvalidFilter,
    /// A size-limited column field holds too many entries.
    LimitExceeded,
}

impl ExportErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportErrorCode::InvalidFilter => "INVALID_FILTER",
            ExportErrorCode::LimitExceeded => "LIMIT_EXCEEDED",
        }
    }
}

impl core::fmt::Display for ExportErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failure returned to the caller instead of a job.
///
/// Raised before anything is persisted; the caller can always fix the request
/// and resubmit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct ExportError {
    pub code: ExportErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ExportError {
    pub fn limit_exceeded(field: impl Into<String>, limit: usize) -> Self {
        Self {
            code: ExportErrorCode::LimitExceeded,
            message: format!("Exceeded the limit of {limit} items"),
            field: Some(field.into()),
        }
    }

    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self {
            code: ExportErrorCode::InvalidFilter,
            message: message.into(),
            field: Some("filter".to_string()),
        }
    }
}
