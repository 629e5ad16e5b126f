use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

/// Errors a handler can return to the client.
///
/// Everything a job does after submission is reported through the progress
/// signal, never as an HTTP error; this type only covers the submission and
/// polling boundary itself.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("no transcription job has been submitted")]
    NotInitialized,

    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotInitialized => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_type = match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::NotInitialized => "not_initialized",
            ApiError::Internal(_) => "internal_error",
        };
        HttpResponse::build(self.status_code()).json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }))
    }
}

impl From<skriba::Error> for ApiError {
    fn from(err: skriba::Error) -> Self {
        match err {
            skriba::Error::Validation(msg) => ApiError::Validation(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
