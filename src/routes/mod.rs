use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use sqlx::sqlite::SqlitePool;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

pub mod shots;

/// Build the application router.
///
/// Only `POST /upload` and `GET /shots` exist; any other method or path,
/// including the wrong method on a known path, is a 404.
pub fn create_router(pool: SqlitePool) -> Router {
    let upload = post(shots::upload_shot).fallback(not_found);
    let list = get(shots::get_shots).fallback(not_found);

    Router::new()
        .route("/upload", upload.clone())
        .route("/upload/", upload)
        .route("/shots", list.clone())
        .route("/shots/", list)
        .fallback(not_found)
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=UTF-8"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(pool)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
