//! Error type shared by the HTTP handlers.
//!
//! Every variant maps to one status code. Database, I/O and template failures
//! are logged with full detail and reported to the client with a generic
//! message.

use std::collections::BTreeMap;
use std::path::PathBuf;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Field name -> messages, as produced by form validation.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Request data failed validation.
    #[error("{message}")]
    Validation {
        message: String,
        fields: FieldErrors,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// A uniqueness rule was violated.
    #[error("{0}")]
    Conflict(String),

    /// The output document is held open by another program.
    #[error("{message}")]
    FileLocked { path: PathBuf, message: String },

    #[error("template error: {0}")]
    Template(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: FieldErrors::new(),
        }
    }

    #[must_use]
    pub fn invalid_fields(message: impl Into<String>, fields: FieldErrors) -> Self {
        Self::Validation {
            message: message.into(),
            fields,
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for a MySQL integrity-constraint violation (SQLSTATE 23000).
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Template(_) | Self::Database(_) | Self::Io(_) | Self::Internal(_)
        )
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::FileLocked { .. } => StatusCode::LOCKED,
            Self::Template(_) | Self::Database(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_internal() {
            tracing::error!(error = %self, "Request failed");
            return HttpResponse::build(self.status_code()).json(json!({
                "message": "Something went wrong, Contact with system admin"
            }));
        }

        match self {
            Self::Validation { message, fields } if !fields.is_empty() => {
                HttpResponse::build(self.status_code()).json(json!({
                    "message": message,
                    "errors": fields,
                }))
            }
            Self::FileLocked { path, message } => {
                tracing::warn!(path = %path.display(), "Output document is locked");
                HttpResponse::build(self.status_code()).json(json!({ "message": message }))
            }
            _ => HttpResponse::build(self.status_code()).json(json!({
                "message": self.to_string()
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn status_codes() {
        assert_eq!(
            AppError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::conflict("Email already exists.").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::FileLocked {
                path: PathBuf::from("a.docx"),
                message: "File is open.".into()
            }
            .status_code(),
            StatusCode::LOCKED
        );
        assert_eq!(
            AppError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn display_is_the_client_message() {
        assert_eq!(
            AppError::not_found("Employee not found").to_string(),
            "Employee not found"
        );
    }

    #[actix_web::test]
    async fn internal_errors_hide_details() {
        let resp = AppError::internal("secret connection string").error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret"));
        assert!(text.contains("Contact with system admin"));
    }

    #[actix_web::test]
    async fn field_errors_are_returned() {
        let mut fields = FieldErrors::new();
        fields
            .entry("email".to_string())
            .or_default()
            .push("Email is required".to_string());
        let resp = AppError::invalid_fields("Please correct the errors", fields).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["errors"]["email"][0], "Email is required");
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AppError = io_err.into();
        assert!(matches!(err, AppError::Io(_)));
    }
}
