//! Filter validation: local JSON parse, then an optional remote semantic check.

pub mod graphql;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use reportflow_reports::{ExportError, ExportObjectType, parse_filter};

pub use graphql::GraphqlFilterValidator;

/// Failure talking to, or rejection by, the remote validator.
///
/// `Display` of `Query` is the remote message verbatim; it is what the caller
/// ends up seeing in the `INVALID_FILTER` error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The remote service answered with application-level errors.
    #[error("{0}")]
    Query(String),
    /// Non-success HTTP status.
    #[error("remote validator returned {status}: {body}")]
    Status { status: u16, body: String },
    /// Network failure, timeout, or an unreadable response.
    #[error("request to remote validator failed: {0}")]
    Request(String),
}

/// Remote semantic validation of a parsed filter.
#[async_trait]
pub trait RemoteFilterValidator: Send + Sync {
    async fn validate(
        &self,
        export_type: ExportObjectType,
        filter: &JsonValue,
    ) -> Result<(), TransportError>;
}

/// Parses a raw filter and, when a remote validator is configured, asks it to
/// accept the parsed payload.
#[derive(Clone, Default)]
pub struct FilterValidator {
    remote: Option<Arc<dyn RemoteFilterValidator>>,
}

impl FilterValidator {
    /// Syntax check only.
    pub fn parse_only() -> Self {
        Self { remote: None }
    }

    pub fn with_remote(remote: Arc<dyn RemoteFilterValidator>) -> Self {
        Self {
            remote: Some(remote),
        }
    }

    /// Returns the parsed filter on success. Any remote failure is reported as
    /// `INVALID_FILTER` with the remote error text.
    pub async fn validate(
        &self,
        export_type: ExportObjectType,
        raw: Option<&str>,
    ) -> Result<Option<JsonValue>, ExportError> {
        let Some(filter) = parse_filter(raw)? else {
            return Ok(None);
        };

        if let Some(remote) = &self.remote {
            remote
                .validate(export_type, &filter)
                .await
                .map_err(|e| ExportError::invalid_filter(e.to_string()))?;
            debug!(export_type = %export_type, "remote validator accepted filter");
        }

        Ok(Some(filter))
    }
}

impl core::fmt::Debug for FilterValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FilterValidator")
            .field("remote", &self.remote.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use reportflow_reports::ExportErrorCode;

    /// Remote stub that records calls and answers with a fixed result.
    struct StubRemote {
        result: Result<(), TransportError>,
        calls: Mutex<Vec<JsonValue>>,
    }

    impl StubRemote {
        fn answering(result: Result<(), TransportError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RemoteFilterValidator for StubRemote {
        async fn validate(
            &self,
            _export_type: ExportObjectType,
            filter: &JsonValue,
        ) -> Result<(), TransportError> {
            self.calls.lock().unwrap().push(filter.clone());
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn absent_filter_skips_the_remote() {
        let remote = StubRemote::answering(Err(TransportError::Query("unused".into())));
        let validator = FilterValidator::with_remote(remote.clone());

        assert_eq!(validator.validate(ExportObjectType::Products, None).await.unwrap(), None);
        assert!(remote.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn parse_failure_never_reaches_the_remote() {
        let remote = StubRemote::answering(Ok(()));
        let validator = FilterValidator::with_remote(remote.clone());

        let err = validator
            .validate(ExportObjectType::Products, Some("{not a real json}"))
            .await
            .unwrap_err();

        assert_eq!(err.code, ExportErrorCode::InvalidFilter);
        assert!(remote.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remote_rejection_message_is_kept_verbatim() {
        let remote = StubRemote::answering(Err(TransportError::Query("remote error".into())));
        let validator = FilterValidator::with_remote(remote.clone());

        let err = validator
            .validate(ExportObjectType::Products, Some(r#"{"notReal": "but json"}"#))
            .await
            .unwrap_err();

        assert_eq!(err.code, ExportErrorCode::InvalidFilter);
        assert_eq!(err.message, "remote error");
        assert_eq!(
            remote.calls.lock().unwrap().as_slice(),
            &[serde_json::json!({"notReal": "but json"})]
        );
    }

    #[tokio::test]
    async fn transport_failures_are_invalid_filters_too() {
        let remote = StubRemote::answering(Err(TransportError::Request("timed out".into())));
        let validator = FilterValidator::with_remote(remote);

        let err = validator
            .validate(ExportObjectType::Orders, Some("{}"))
            .await
            .unwrap_err();

        assert_eq!(err.code, ExportErrorCode::InvalidFilter);
        assert_eq!(err.message, "request to remote validator failed: timed out");
    }

    #[tokio::test]
    async fn accepted_filter_is_returned_parsed() {
        let validator = FilterValidator::with_remote(StubRemote::answering(Ok(())));

        let parsed = validator
            .validate(ExportObjectType::Products, Some(r#"{"search": "shirt"}"#))
            .await
            .unwrap();

        assert_eq!(parsed, Some(serde_json::json!({"search": "shirt"})));
    }

    #[tokio::test]
    async fn parse_only_accepts_any_json() {
        let parsed = FilterValidator::parse_only()
            .validate(ExportObjectType::Products, Some("[1, 2]"))
            .await
            .unwrap();
        assert_eq!(parsed, Some(serde_json::json!([1, 2])));
    }
}
