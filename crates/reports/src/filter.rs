//! Filter payload parsing.
//!
//! The filter arrives as a JSON-encoded string. Only syntax is checked here;
//! semantic checks belong to the remote validator wired in by infra.

use serde_json::Value as JsonValue;

use crate::error::ExportError;

/// Parse an optional raw filter.
///
/// `None` means "no filter" and is always valid; so does a literal JSON
/// `null`. A parse failure is reported as `INVALID_FILTER` carrying the
/// parser's diagnostic. Object keys keep their submitted order.
pub fn parse_filter(raw: Option<&str>) -> Result<Option<JsonValue>, ExportError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    match serde_json::from_str(raw) {
        Ok(JsonValue::Null) => Ok(None),
        Ok(filter) => Ok(Some(filter)),
        Err(e) => Err(ExportError::invalid_filter(e.to_string())),
    }
}
