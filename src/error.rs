//! HTTP-facing error type.
//!
//! Every handler returns `Result<_, AppError>`. Server-side failures are
//! logged here and reach the client only as a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::DbLockError;
use crate::import::ImportError;
use crate::selection::StructureError;
use crate::validation::ValidationErrors;

pub const MSG_UNAUTHORIZED: &str = "لطفاً ابتدا وارد حساب کاربری خود شوید";
pub const MSG_FORBIDDEN: &str = "شما به این بخش دسترسی ندارید";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("{}", MSG_UNAUTHORIZED)]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Lock(#[from] DbLockError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn forbidden() -> Self {
        Self::Forbidden(MSG_FORBIDDEN.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) | Self::Import(_) => StatusCode::BAD_REQUEST,
            Self::Structure(StructureError::NotEnoughQuestions { .. }) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Structure(StructureError::Database(_))
            | Self::Database(_)
            | Self::Lock(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(errors) => json!({
                "error": "Invalid request",
                "details": errors.fields(),
            }),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Request failed: {}", self);
                json!({ "error": "Internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("Exam").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let shortage = StructureError::NotEnoughQuestions {
            juz: 3,
            kind: crate::domain::QuestionKind::Concepts,
            needed: 3,
            found: 1,
        };
        assert_eq!(AppError::from(shortage).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(AppError::NotFound("Ticket").to_string(), "Ticket not found");
    }
}
