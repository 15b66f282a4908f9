//! List/create/update/delete over a `TodoStore`.
//!
//! # Design
//! `TodoService` holds only an `Arc<dyn TodoStore>` and carries no state
//! between calls. Item-scoped operations start with `load`, which turns a
//! missing id into `TodoError::NotFound` before any validation or write.
//! Payloads arrive as raw JSON so the validation schema can report type
//! errors per field.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::TodoError;
use crate::store::TodoStore;
use crate::types::{NewTodo, Todo, TodoChanges, TodoFilter};
use crate::validation::Schema;

#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn TodoStore {
        self.store.as_ref()
    }

    pub async fn list(&self, filter: TodoFilter) -> Result<Vec<Todo>, TodoError> {
        Ok(self.store.find_filtered(filter).await?)
    }

    /// Validate, check the title is free within the group, then insert.
    pub async fn create(&self, payload: &Value) -> Result<Todo, TodoError> {
        let payload = as_object(payload);
        Schema::create_todo()
            .validate(&payload, self.store())
            .await?;

        let new = NewTodo::from_payload(&payload);
        if self
            .store
            .find_duplicate(&new.title, new.group_id, None)
            .await?
            .is_some()
        {
            return Err(TodoError::DuplicateTitle);
        }

        let todo = self.store.insert(new).await?;
        tracing::debug!(id = todo.id, group_id = ?todo.group_id, "created todo");
        Ok(todo)
    }

    /// Apply the supplied fields of `payload` to todo `id`.
    ///
    /// When `title` or `group_id` is supplied, the merged pair must not match
    /// any other todo. A payload that changes nothing skips the write.
    pub async fn update(&self, id: i64, payload: &Value) -> Result<Todo, TodoError> {
        let todo = self.load(id).await?;
        let payload = as_object(payload);
        Schema::update_todo()
            .validate(&payload, self.store())
            .await?;

        let changes = TodoChanges::from_payload(&payload);
        if changes.title.is_some() || changes.group_id.is_some() {
            let (title, group_id) = changes.effective_key(&todo);
            if self
                .store
                .find_duplicate(title, group_id, Some(todo.id))
                .await?
                .is_some()
            {
                return Err(TodoError::DuplicateTitle);
            }
        }

        tracing::info!(id = todo.id, new_group_id = ?changes.group_id, "Updating Todo");

        if !changes.is_dirty(&todo) {
            return Ok(todo);
        }
        self.store
            .update_partial(todo.id, &changes)
            .await?
            .ok_or(TodoError::NotFound(id))
    }

    pub async fn delete(&self, id: i64) -> Result<(), TodoError> {
        let todo = self.load(id).await?;
        if !self.store.delete_by_id(todo.id).await? {
            return Err(TodoError::NotFound(id));
        }
        tracing::debug!(id, "deleted todo");
        Ok(())
    }

    /// Load-or-404 step for item-scoped operations.
    pub async fn load(&self, id: i64) -> Result<Todo, TodoError> {
        self.store.find(id).await?.ok_or(TodoError::NotFound(id))
    }
}

/// Non-object bodies validate as an empty payload.
fn as_object(payload: &Value) -> Map<String, Value> {
    payload.as_object().cloned().unwrap_or_default()
}
