//! HTTP mapping for core errors.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use taskmeter_core::error::{ErrorCode, MeterError};
use thiserror::Error;

/// Wrapper so core errors can be returned from handlers.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub MeterError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.code() {
            ErrorCode::AuthFailed => StatusCode::UNAUTHORIZED,
            ErrorCode::UnknownMetric
            | ErrorCode::InvalidLabel
            | ErrorCode::KindMismatch
            | ErrorCode::BadConfig => StatusCode::BAD_REQUEST,
            ErrorCode::BadRegistration
            | ErrorCode::Exposition
            | ErrorCode::UnsupportedVersion
            | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.0.code().as_str(),
            "message": self.0.to_string(),
        }));
        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }
        (status, body).into_response()
    }
}
