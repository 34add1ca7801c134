use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::Json,
};
use sqlx::sqlite::SqlitePool;
use crate::db;
use crate::error::ApiError;
use crate::models::{ShotRow, UploadResponse};
use crate::validation;

/// POST /upload - Record one shot for a user
///
/// The body is read as raw bytes so that a missing or wrong content type
/// still gets field-level validation errors.
pub async fn upload_shot(
    State(pool): State<SqlitePool>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let body = body?;
    let shot = validation::parse_upload(&body)?;

    let shot_id = db::insert_shot(&pool, &shot)
        .await
        .map_err(ApiError::Write)?;

    tracing::info!(shot_id, user_id = %shot.user_id, "Stored shot");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Shot data saved to database successfully.",
            shot_id,
            data: shot,
        }),
    ))
}

/// GET /shots - List a user's shots in a time window, newest first
///
/// Query params:
/// - userId, startTime, endTime: required, times in seconds since epoch (inclusive)
/// - made: only shots considered made, when exactly "true"
pub async fn get_shots(
    State(pool): State<SqlitePool>,
    params: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<Vec<ShotRow>>, ApiError> {
    let Query(params) = params?;
    let filter = validation::parse_shot_query(&params)?;

    let shots = db::get_shots(&pool, &filter)
        .await
        .map_err(ApiError::Query)?;

    Ok(Json(shots))
}
