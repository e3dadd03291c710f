use axum::Router;

pub mod exports;
pub mod system;

/// Router for all export endpoints.
pub fn router() -> Router {
    Router::new().nest("/exports", exports::router())
}
