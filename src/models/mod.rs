use serde::Serialize;

/// A shot quality observation built from an upload, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shot {
    pub arc_quality: f64,
    pub short_quality: f64,
    pub long_quality: f64,
    /// `None` when the client did not say whether the shot was a brick
    pub brick: Option<bool>,
    pub timestamp: i64,
    pub user_id: String,
}

impl Shot {
    /// Stamps the shot with the current server time (seconds since epoch).
    pub fn new(
        arc_quality: f64,
        short_quality: f64,
        long_quality: f64,
        brick: Option<bool>,
        user_id: String,
    ) -> Self {
        Self {
            arc_quality,
            short_quality,
            long_quality,
            brick,
            timestamp: chrono::Utc::now().timestamp(),
            user_id,
        }
    }
}

/// Row from the shots table as returned by `GET /shots`
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct ShotRow {
    pub id: i64,
    pub arc_quality: f64,
    pub short_quality: f64,
    pub long_quality: f64,
    pub brick: Option<bool>,
    pub timestamp: i64,
}

/// Filter for listing a user's shots
#[derive(Debug, Clone, PartialEq)]
pub struct ShotFilter {
    pub user_id: String,
    /// Inclusive lower bound, seconds since epoch
    pub start_time: i64,
    /// Inclusive upper bound, seconds since epoch
    pub end_time: i64,
    /// Only keep shots considered made
    pub made_only: bool,
}

/// Response body for a successful upload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: &'static str,
    pub shot_id: i64,
    pub data: Shot,
}
