use axum::{
    extract::rejection::{BytesRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors a request handler can answer with
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required fields.")]
    MissingFields(Vec<&'static str>),

    #[error("arcQuality, shortQuality, and longQuality must be numbers.")]
    InvalidQualities(Vec<&'static str>),

    #[error("Field 'brick' must be a boolean.")]
    InvalidBrick,

    #[error("Missing required query parameters.")]
    MissingParams(Vec<&'static str>),

    #[error("startTime and endTime must be numeric timestamps.")]
    InvalidTimeRange,

    #[error("Failed to write to database.")]
    Write(#[source] sqlx::Error),

    #[error("Failed to query database.")]
    Query(#[source] sqlx::Error),

    #[error("Endpoint not found.")]
    NotFound,

    /// The request could not be read at all (oversized body, bad query string)
    #[error("{1}")]
    Rejected(StatusCode, String),
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    invalid: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields(_)
            | ApiError::InvalidQualities(_)
            | ApiError::InvalidBrick
            | ApiError::MissingParams(_)
            | ApiError::InvalidTimeRange => StatusCode::BAD_REQUEST,
            ApiError::Write(_) | ApiError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Rejected(status, _) => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = ErrorResponse {
            message: self.to_string(),
            missing: None,
            invalid: None,
            error: None,
        };

        match self {
            ApiError::MissingFields(fields) | ApiError::MissingParams(fields) => {
                body.missing = Some(fields);
            }
            ApiError::InvalidQualities(fields) => body.invalid = Some(fields),
            ApiError::Write(err) | ApiError::Query(err) => {
                tracing::error!("{}: {}", body.message, err);
                body.error = Some(err.to_string());
            }
            ApiError::InvalidBrick
            | ApiError::InvalidTimeRange
            | ApiError::NotFound
            | ApiError::Rejected(..) => {}
        }

        (status, Json(body)).into_response()
    }
}

/// Errors that stop the server from starting
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid configuration")]
    Config(#[from] ConfigError),

    #[error("Failed to open database")]
    DatabaseOpen(#[source] sqlx::Error),

    #[error("Failed to initialize database schema")]
    Schema(#[source] sqlx::Error),

    #[error("Failed to bind to address")]
    Bind(#[source] std::io::Error),

    #[error("Server error")]
    Serve(#[source] std::io::Error),
}
