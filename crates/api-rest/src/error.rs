//! Mapping from core errors to HTTP responses.

use api_shared::{ErrorRes, MessageRes};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use patient_core::PatientError;

/// Error returned by every patient handler.
#[derive(Debug)]
pub enum ApiError {
    /// The request body was not the JSON we expected.
    InvalidBody(String),
    Patient(PatientError),
}

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        ApiError::Patient(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidBody(reason) => {
                (StatusCode::BAD_REQUEST, Json(ErrorRes::new(reason))).into_response()
            }
            ApiError::Patient(err @ PatientError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, Json(ErrorRes::new(err.to_string()))).into_response()
            }
            ApiError::Patient(err @ PatientError::Conflict) => {
                (StatusCode::CONFLICT, Json(ErrorRes::new(err.to_string()))).into_response()
            }
            ApiError::Patient(PatientError::NotFound) => (
                StatusCode::NOT_FOUND,
                Json(MessageRes::new("Patient not found")),
            )
                .into_response(),
            ApiError::Patient(err) => {
                tracing::error!("patient operation failed: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorRes::new("Internal error")),
                )
                    .into_response()
            }
        }
    }
}
