//! Input checks for the upload and query endpoints.
//!
//! Uploads arrive as loosely typed JSON: numbers may be sent as numeric
//! strings, `userId` may be any JSON value, and `null` means "not given".

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::models::{Shot, ShotFilter};

const REQUIRED_UPLOAD_FIELDS: [&str; 4] = ["arcQuality", "shortQuality", "longQuality", "userId"];
const QUALITY_FIELDS: [&str; 3] = ["arcQuality", "shortQuality", "longQuality"];
const REQUIRED_QUERY_PARAMS: [&str; 3] = ["userId", "startTime", "endTime"];

/// Parse and validate an upload body into a timestamped `Shot`.
///
/// A body that is not a JSON object is treated as empty, so every required
/// field is reported missing.
pub fn parse_upload(body: &[u8]) -> Result<Shot, ApiError> {
    let fields = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let missing: Vec<&'static str> = REQUIRED_UPLOAD_FIELDS
        .into_iter()
        .filter(|name| !is_set(&fields, name))
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }

    let invalid: Vec<&'static str> = QUALITY_FIELDS
        .into_iter()
        .filter(|name| fields.get(*name).and_then(numeric_value).is_none())
        .collect();
    if !invalid.is_empty() {
        return Err(ApiError::InvalidQualities(invalid));
    }

    let brick = match fields.get("brick") {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => return Err(ApiError::InvalidBrick),
    };

    let quality = |name: &str| fields.get(name).and_then(numeric_value).unwrap_or_default();
    let user_id = fields.get("userId").map(coerce_to_string).unwrap_or_default();

    Ok(Shot::new(
        quality("arcQuality"),
        quality("shortQuality"),
        quality("longQuality"),
        brick,
        user_id,
    ))
}

/// Validate `GET /shots` query parameters into a filter.
pub fn parse_shot_query(params: &HashMap<String, String>) -> Result<ShotFilter, ApiError> {
    let missing: Vec<&'static str> = REQUIRED_QUERY_PARAMS
        .into_iter()
        .filter(|name| !params.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::MissingParams(missing));
    }

    let bound = |name: &str| params.get(name).and_then(|raw| parse_numeric(raw));
    let (Some(start_time), Some(end_time)) = (bound("startTime"), bound("endTime")) else {
        return Err(ApiError::InvalidTimeRange);
    };

    Ok(ShotFilter {
        user_id: params.get("userId").cloned().unwrap_or_default(),
        // Truncated toward zero
        start_time: start_time as i64,
        end_time: end_time as i64,
        made_only: params.get("made").is_some_and(|made| made == "true"),
    })
}

fn is_set(fields: &Map<String, Value>, name: &str) -> bool {
    !matches!(fields.get(name), None | Some(Value::Null))
}

/// Numeric value of a JSON number or numeric string.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

/// Parse a decimal number with optional sign, fraction and exponent.
/// Surrounding whitespace is allowed; `inf`, `NaN` and hex are not numbers.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E');
    if !trimmed.chars().all(allowed) || !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// String form of an arbitrary JSON value, used for `userId`.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null => String::new(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}
