use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use reportflow_infra::{ServiceError, SubmitError};
use reportflow_reports::ExportError;

/// Validation failure: `400 {code, message, field}`.
pub fn export_error_response(err: ExportError) -> Response {
    (StatusCode::BAD_REQUEST, Json(err)).into_response()
}

pub fn submit_error_to_response(err: SubmitError) -> Response {
    match err {
        SubmitError::Rejected(e) => export_error_response(e),
        SubmitError::Store(e) => {
            tracing::error!(error = %e, "export submission failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        SubmitError::Dispatch { report, source } => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "dispatch_failed",
            format!("export job {} could not be queued: {source}", report.id),
        ),
    }
}

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "export job read failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
