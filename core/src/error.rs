//! Error types for todo operations.
//!
//! # Design
//! `NotFound` and `DuplicateTitle` get dedicated variants because the HTTP
//! layer answers them with their own status codes and bodies. Anything the
//! store cannot explain lands in `StoreError::Backend` with its source kept
//! for logging.

use thiserror::Error;

use crate::validation::ValidationErrors;

pub const DUPLICATE_TITLE_MESSAGE: &str = "A todo with the same title and group already exists.";

/// Errors returned by `TodoService` operations.
#[derive(Debug, Error)]
pub enum TodoError {
    /// One or more payload fields failed their rules.
    #[error("{}", .0.message())]
    Validation(ValidationErrors),

    /// Another todo in the same group already has this title.
    #[error("A todo with the same title and group already exists.")]
    DuplicateTitle,

    /// No todo has the requested id.
    #[error("Todo {0} not found.")]
    NotFound(i64),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for TodoError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateTitle => TodoError::DuplicateTitle,
            other => TodoError::Store(other),
        }
    }
}

/// Errors returned by `TodoStore` implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write would break the per-group title uniqueness constraint.
    #[error("todo title already exists in this group")]
    DuplicateTitle,

    #[error("store backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(error))
    }
}
