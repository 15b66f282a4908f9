//! Repository interface over todo persistence.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{NewTodo, Todo, TodoChanges, TodoFilter};

/// Persistence collaborator for todos.
///
/// Implementations own all storage concerns. `insert` and `update_partial`
/// must reject a write that would give two todos in the same group the same
/// title with `StoreError::DuplicateTitle`, atomically with the write itself.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<Todo>, StoreError>;

    /// All todos matching `filter`, ascending by id.
    async fn find_filtered(&self, filter: TodoFilter) -> Result<Vec<Todo>, StoreError>;

    /// A todo with exactly this title and group, other than `excluding`.
    /// A `None` group never matches, the same as the unique index.
    async fn find_duplicate(
        &self,
        title: &str,
        group_id: Option<i64>,
        excluding: Option<i64>,
    ) -> Result<Option<Todo>, StoreError>;

    async fn insert(&self, new: NewTodo) -> Result<Todo, StoreError>;

    /// Write the supplied fields and bump `updated_at`. Returns `None` when
    /// the id does not exist.
    async fn update_partial(
        &self,
        id: i64,
        changes: &TodoChanges,
    ) -> Result<Option<Todo>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete_by_id(&self, id: i64) -> Result<bool, StoreError>;

    async fn group_exists(&self, id: i64) -> Result<bool, StoreError>;
}
