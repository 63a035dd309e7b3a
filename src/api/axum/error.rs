use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::GateError;
use crate::api::ErrorResponse;

/// converts `GateError` into an HTTP response
#[derive(Debug)]
pub struct AppError(pub GateError);

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        Self(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GateError::NotFound => StatusCode::NOT_FOUND,
            GateError::Expired => StatusCode::GONE,
            GateError::InvalidState
            | GateError::Conflict
            | GateError::LastOwner
            | GateError::AlreadyMember
            | GateError::DuplicatePendingInvite
            | GateError::UserAlreadyExists => StatusCode::CONFLICT,
            GateError::Forbidden | GateError::EmailMismatch => StatusCode::FORBIDDEN,
            GateError::InvalidEmail | GateError::InvalidPassword | GateError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            GateError::InvalidCredentials
            | GateError::TokenInvalid
            | GateError::TokenExpired
            | GateError::UserNotFound => StatusCode::UNAUTHORIZED,
            GateError::DatabaseError(_) | GateError::Internal(_) | GateError::PasswordHashError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!(target: "gatehouse", "msg=\"request failed\", error=\"{}\"", self.0);
        }
        (status, Json(ErrorResponse::from(self.0))).into_response()
    }
}
