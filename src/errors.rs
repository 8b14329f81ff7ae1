use crate::guard::Reason;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Guard(#[from] Reason),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("request too large")]
    RequestTooLarge,
    #[error("file too large")]
    FileTooLarge,
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Guard(reason) => reason.code(),
            AppError::BadRequest(_) => "BadRequest",
            AppError::RequestTooLarge => "RequestTooLarge",
            AppError::FileTooLarge => "FileTooLarge",
            AppError::Internal(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Guard(Reason::InvalidInput) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Guard(Reason::Traversal) => StatusCode::FORBIDDEN,
            AppError::Guard(Reason::NotFound) => StatusCode::NOT_FOUND,
            AppError::RequestTooLarge | AppError::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Guard(Reason::OtherIoError) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody { code: self.code(), message: self.to_string() };
        (self.status(), Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
