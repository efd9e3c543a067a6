//! Error types for Biblioteca server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes, used in JSON bodies and in `?error=` redirects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    InvalidCredentials = 2,
    NotAuthenticated = 3,
    NotAuthorized = 4,
    DbFailure = 5,
    NotFound = 6,
    BadValue = 7,
    Duplicate = 8,
    NoCopiesAvailable = 9,
    RentalLimitExceeded = 10,
    AlreadyReturned = 11,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Failure => "failure",
            ErrorCode::InvalidCredentials => "invalid_credentials",
            ErrorCode::NotAuthenticated => "not_authenticated",
            ErrorCode::NotAuthorized => "not_authorized",
            ErrorCode::DbFailure => "db_failure",
            ErrorCode::NotFound => "not_found",
            ErrorCode::BadValue => "bad_value",
            ErrorCode::Duplicate => "duplicate",
            ErrorCode::NoCopiesAvailable => "no_copies_available",
            ErrorCode::RentalLimitExceeded => "rental_limit_exceeded",
            ErrorCode::AlreadyReturned => "already_returned",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a credential pair was rejected. Never shown to the user.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("no account with this email")]
    NotFound,
    #[error("password does not match")]
    BadCredential,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(AuthFailure),

    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Authorization failed: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("No copies available for book {0}")]
    NoCopiesAvailable(i32),

    #[error("Student {student_id} already holds {limit} active rentals")]
    RentalLimitExceeded { student_id: i32, limit: i32 },

    #[error("Rental {0} was already returned")]
    AlreadyReturned(i32),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::Authentication(_) => ErrorCode::InvalidCredentials,
            AppError::Unauthenticated(_) => ErrorCode::NotAuthenticated,
            AppError::Unauthorized(_) => ErrorCode::NotAuthorized,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Conflict(_) => ErrorCode::Duplicate,
            AppError::NoCopiesAvailable(_) => ErrorCode::NoCopiesAvailable,
            AppError::RentalLimitExceeded { .. } => ErrorCode::RentalLimitExceeded,
            AppError::AlreadyReturned(_) => ErrorCode::AlreadyReturned,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) | AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::AlreadyReturned(_) => StatusCode::CONFLICT,
            AppError::NoCopiesAvailable(_) | AppError::RentalLimitExceeded { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the end user
    pub fn user_message(&self) -> String {
        match self {
            // Same message whichever half of the credential pair was wrong
            AppError::Authentication(_) => "Invalid email or password".to_string(),
            AppError::Database(_) => "Database error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Storage or programming failures; only these abort the request with a 500
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Internal(_))
    }

    /// Errors that send the user back to the login page
    pub fn is_session_error(&self) -> bool {
        matches!(self, AppError::Unauthenticated(_) | AppError::Unauthorized(_))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "invalid value".to_string());
                format!("{}: {}", field, message)
            })
            .collect();
        fields.sort();
        AppError::Validation(fields.join("; "))
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();

        match &self {
            AppError::Unauthenticated(msg) | AppError::Unauthorized(msg) => {
                tracing::info!("Sending client back to login: {}", msg);
                return Redirect::to(&format!("/?error={}", code)).into_response();
            }
            AppError::Authentication(reason) => {
                tracing::info!("Login rejected: {}", reason);
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
            }
            _ => {}
        }

        let body = Json(ErrorResponse {
            code: code as u32,
            error: code.as_str().to_string(),
            message: self.user_message(),
        });

        (self.status(), body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
