use crate::ipc::error::err;
use crate::model::parse_date_param;
use crate::sync::SyncError;
use chrono::NaiveDate;
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<SyncError> for HandlerErr {
    fn from(e: SyncError) -> Self {
        let details = e.http_status().map(|s| json!({ "httpStatus": s }));
        Self {
            code: e.code(),
            message: e.message().to_string(),
            details,
        }
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// `params[key]` as a date, or `fallback` when absent or null.
pub fn get_date_or(
    params: &serde_json::Value,
    key: &str,
    fallback: NaiveDate,
) -> Result<NaiveDate, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(fallback),
        Some(v) => {
            let raw = v
                .as_str()
                .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a string", key)))?;
            parse_date_param(raw).map_err(HandlerErr::bad_params)
        }
    }
}

/// Classroom filter: a number, a numeric string, or absent/null/"all" for
/// every classroom.
pub fn get_classroom_filter(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<i64>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a whole number", key))),
        Some(serde_json::Value::String(s)) if s.trim().eq_ignore_ascii_case("all") => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| HandlerErr::bad_params(format!("{} must be a classroom number or \"all\"", key))),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be a classroom number", key))),
    }
}
