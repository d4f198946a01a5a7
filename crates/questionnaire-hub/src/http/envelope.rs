use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// Success envelope: `{"success": true, "data": ..., "message": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    respond(StatusCode::OK, Some(data), None)
}

pub fn created<T: Serialize>(data: T, message: &str) -> Response {
    respond(StatusCode::CREATED, Some(data), Some(message.to_string()))
}

pub fn message(text: &str) -> Response {
    respond::<()>(StatusCode::OK, None, Some(text.to_string()))
}

fn respond<T: Serialize>(status: StatusCode, data: Option<T>, message: Option<String>) -> Response {
    let body = ApiSuccess {
        success: true,
        data,
        message,
    };
    (status, Json(body)).into_response()
}

/// Error envelope: `{"error": <status text>, "message": ..., "code": <status>}`.
pub fn error_response(status: StatusCode, message: String) -> Response {
    let payload = json!({
        "error": status.canonical_reason().unwrap_or("Error"),
        "message": message,
        "code": status.as_u16(),
    });
    (status, Json(payload)).into_response()
}
