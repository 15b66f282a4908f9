//! Domain core for the todo service.
//!
//! # Overview
//! Holds everything about todos that does not depend on HTTP: the record
//! types, the validation schema, the error taxonomy, the `TodoStore`
//! repository interface with an in-memory implementation, and
//! `TodoService`, which implements list/create/update/delete on top of any
//! store.
//!
//! # Design
//! - `TodoService` is stateless apart from its `Arc<dyn TodoStore>`.
//! - Validation runs before business rules; the duplicate-title check runs
//!   after validation and is backed by a uniqueness constraint in every store.
//! - The HTTP crate maps `TodoError` variants to status codes; nothing here
//!   knows about status codes.

pub mod error;
pub mod memory;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

pub use error::{StoreError, TodoError, DUPLICATE_TITLE_MESSAGE};
pub use memory::MemoryTodoStore;
pub use service::TodoService;
pub use store::TodoStore;
pub use types::{Group, NewTodo, Todo, TodoChanges, TodoFilter};
pub use validation::{FieldRules, Rule, Schema, ValidationErrors};
