use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use es_core::Error;
use serde_json::json;
use tracing::error;

/// Wraps a domain error so handlers can use `?`; renders `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::AlreadyExists(_) | Error::Config(_) | Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match &self.0 {
            Error::AlreadyExists(msg)
            | Error::NotFound(msg)
            | Error::Config(msg)
            | Error::InvalidUrl(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
