//! Error types for the library catalog server

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchAuthor = 4,
    NoSuchGenre = 5,
    NoSuchBook = 6,
    NoSuchUser = 7,
    Duplicate = 8,
    BadValue = 18,
}

/// Catalog resource named in `NotFound` and `Conflict` failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Author,
    Genre,
    Book,
    User,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Author => "Author",
            Resource::Genre => "Genre",
            Resource::Book => "Book",
            Resource::User => "User",
        };
        f.write_str(name)
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{resource} {key} not found")]
    NotFound { resource: Resource, key: String },

    #[error("{resource} already exists with {key}")]
    Conflict { resource: Resource, key: String },

    /// Mutating operation attempted by an anonymous caller
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Login with bad credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Non-database store failure (e.g. a poisoned in-memory lock)
    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(resource: Resource, key: impl fmt::Display) -> Self {
        AppError::NotFound {
            resource,
            key: key.to_string(),
        }
    }

    pub fn conflict(resource: Resource, key: impl Into<String>) -> Self {
        AppError::Conflict {
            resource,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict { .. })
    }

    /// HTTP status this failure maps to at the transport boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unauthorized(_) | AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidArgument(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
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
        let status = self.status_code();
        let (code, message) = match &self {
            AppError::NotFound { resource, .. } => {
                let code = match resource {
                    Resource::Author => ErrorCode::NoSuchAuthor,
                    Resource::Genre => ErrorCode::NoSuchGenre,
                    Resource::Book => ErrorCode::NoSuchBook,
                    Resource::User => ErrorCode::NoSuchUser,
                };
                (code, self.to_string())
            }
            AppError::Conflict { .. } => (ErrorCode::Duplicate, self.to_string()),
            AppError::Unauthorized(msg) | AppError::Authentication(msg) => {
                (ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::InvalidArgument(msg) | AppError::Validation(msg) => {
                (ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (ErrorCode::DbFailure, "An internal database error occurred".to_string())
            }
            AppError::Store(msg) => {
                tracing::error!("Store error: {}", msg);
                (ErrorCode::DbFailure, "An internal database error occurred".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (ErrorCode::Failure, "Internal server error".to_string())
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds_map_to_statuses() {
        assert_eq!(
            AppError::not_found(Resource::Book, "x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::conflict(Resource::Genre, "name: Poetry").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Unauthorized("no principal".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::InvalidArgument("blank".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Store("lock poisoned".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_name_the_resource() {
        let err = AppError::not_found(Resource::Genre, "Poetry");
        assert_eq!(err.to_string(), "Genre Poetry not found");

        let err = AppError::conflict(Resource::Book, "title \"Dune\" and author id 1");
        assert_eq!(
            err.to_string(),
            "Book already exists with title \"Dune\" and author id 1"
        );
    }

    #[test]
    fn test_store_failure_hides_internals() {
        let response = AppError::Store("lock poisoned at arena.rs".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
