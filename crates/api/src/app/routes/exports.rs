use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use reportflow_core::ExportJobId;
use reportflow_reports::ExportObjectType;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

const DEFAULT_PAGE_SIZE: usize = 20;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_exports))
        .route("/products", post(export_products))
        .route("/orders", post(export_orders))
        .route("/:id", get(get_export))
        .route("/:id/file", get(get_export_file))
}

pub async fn export_products(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ExportRequest>,
) -> Response {
    submit(&services, ExportObjectType::Products, body).await
}

pub async fn export_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ExportRequest>,
) -> Response {
    submit(&services, ExportObjectType::Orders, body).await
}

async fn submit(
    services: &AppServices,
    export_type: ExportObjectType,
    body: dto::ExportRequest,
) -> Response {
    let filter = body.filter_str().map(str::to_owned);

    match services
        .exports
        .submit_export(export_type, body.columns, filter.as_deref())
        .await
    {
        Ok(report) => (StatusCode::CREATED, Json(report)).into_response(),
        Err(e) => errors::submit_error_to_response(e),
    }
}

pub async fn list_exports(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListExportsQuery>,
) -> Response {
    let after = match query.after.as_deref().map(str::parse::<ExportJobId>).transpose() {
        Ok(after) => after,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_cursor", "invalid cursor"),
    };

    match services
        .exports
        .list_jobs(query.first.unwrap_or(DEFAULT_PAGE_SIZE), after)
        .await
    {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_export(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.exports.get_job(id).await {
        Ok(job) => Json(job).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_export_file(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.exports.get_job(id).await {
        Ok(job) => Json(dto::ExportFileResponse {
            id: job.id,
            status: job.status,
            file: job.content_artifact,
        })
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn parse_id(raw: &str) -> Result<ExportJobId, Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid export id"))
}
