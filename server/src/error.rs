//! HTTP error responses.
//!
//! Every failure leaves the server as a JSON body with a top-level
//! `message`. Validation and duplicate-title failures also carry an `errors`
//! map of field name to messages, so both answer with the same 422 shape.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use todo_core::{TodoError, ValidationErrors, DUPLICATE_TITLE_MESSAGE};

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

/// Status code plus JSON body for a failed request.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                message: message.into(),
                errors: None,
            },
        }
    }

    pub fn unprocessable(errors: ValidationErrors) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: ErrorBody {
                message: errors.message(),
                errors: Some(errors),
            },
        }
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<TodoError> for ApiErrorResponse {
    fn from(error: TodoError) -> Self {
        match error {
            TodoError::Validation(errors) => Self::unprocessable(errors),
            TodoError::DuplicateTitle => {
                Self::unprocessable(ValidationErrors::single("title", DUPLICATE_TITLE_MESSAGE))
            }
            TodoError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, error.to_string()),
            TodoError::Store(source) => {
                tracing::error!(error = %source, "todo store failure");
                Self::internal()
            }
        }
    }
}

// Extractor rejections keep axum's status code but answer with the JSON shape.
impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiErrorResponse {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiErrorResponse {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}
