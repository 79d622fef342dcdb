use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

pub type TrustResult<T> = std::result::Result<T, TrustError>;

#[derive(Error, Debug)]
pub enum TrustError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    #[error("Duplicate review: {0}")]
    DuplicateReview(String),

    #[error("Too many review submissions, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for TrustError {
    fn from(err: validator::ValidationErrors) -> Self {
        TrustError::Validation(err.to_string())
    }
}

impl TrustError {
    fn error_type(&self) -> &str {
        match self {
            TrustError::Database(_) => "database_error",
            TrustError::Validation(_) => "validation_error",
            TrustError::UserNotFound(_) | TrustError::TransactionNotFound(_) => "not_found",
            TrustError::DuplicateReview(_) => "duplicate_error",
            TrustError::RateLimited { .. } => "rate_limit",
            TrustError::Unauthorized(_) => "unauthorized",
            TrustError::Internal(_) => "internal_error",
        }
    }

    /// Message shown to the caller. Storage and internal failures stay in the logs.
    fn public_message(&self) -> String {
        match self {
            TrustError::Database(_) | TrustError::Internal(_) => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl ResponseError for TrustError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let mut response = HttpResponse::build(status_code);
        if let TrustError::RateLimited { retry_after_secs } = self {
            response.insert_header(("Retry-After", retry_after_secs.to_string()));
        }

        response.json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.public_message(),
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            TrustError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TrustError::Validation(_) => StatusCode::BAD_REQUEST,
            TrustError::UserNotFound(_) => StatusCode::NOT_FOUND,
            TrustError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
            TrustError::DuplicateReview(_) => StatusCode::CONFLICT,
            TrustError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            TrustError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            TrustError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
