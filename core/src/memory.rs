//! In-memory `TodoStore`.
//!
//! Rows live in ordered maps behind a single `tokio::sync::RwLock`, so every
//! write (uniqueness check included) happens under one write guard.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::TodoStore;
use crate::types::{Group, NewTodo, Todo, TodoChanges, TodoFilter};

#[derive(Debug, Default)]
struct Tables {
    todos: BTreeMap<i64, Todo>,
    groups: BTreeMap<i64, Group>,
    last_todo_id: i64,
    last_group_id: i64,
}

impl Tables {
    /// Mirrors a `UNIQUE (group_id, title)` index: rows without a group never
    /// collide.
    fn duplicate_of(
        &self,
        title: &str,
        group_id: Option<i64>,
        excluding: Option<i64>,
    ) -> Option<&Todo> {
        group_id?;
        self.todos.values().find(|todo| {
            Some(todo.id) != excluding && todo.group_id == group_id && todo.title == title
        })
    }

    fn collides(&self, title: &str, group_id: Option<i64>, excluding: Option<i64>) -> bool {
        self.duplicate_of(title, group_id, excluding).is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTodoStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the group called `name`, creating it first if needed.
    pub async fn ensure_group(&self, name: &str) -> Group {
        let mut tables = self.tables.write().await;
        if let Some(group) = tables.groups.values().find(|group| group.name == name) {
            return group.clone();
        }
        tables.last_group_id += 1;
        let now = Utc::now();
        let group = Group {
            id: tables.last_group_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.groups.insert(group.id, group.clone());
        group
    }
}

#[async_trait]
impl TodoStore for MemoryTodoStore {
    async fn find(&self, id: i64) -> Result<Option<Todo>, StoreError> {
        Ok(self.tables.read().await.todos.get(&id).cloned())
    }

    async fn find_filtered(&self, filter: TodoFilter) -> Result<Vec<Todo>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .todos
            .values()
            .filter(|todo| filter.matches(todo))
            .cloned()
            .collect())
    }

    async fn find_duplicate(
        &self,
        title: &str,
        group_id: Option<i64>,
        excluding: Option<i64>,
    ) -> Result<Option<Todo>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.duplicate_of(title, group_id, excluding).cloned())
    }

    async fn insert(&self, new: NewTodo) -> Result<Todo, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.collides(&new.title, new.group_id, None) {
            return Err(StoreError::DuplicateTitle);
        }
        tables.last_todo_id += 1;
        let now = Utc::now();
        let todo = Todo {
            id: tables.last_todo_id,
            title: new.title,
            completed: false,
            group_id: new.group_id,
            created_at: now,
            updated_at: now,
        };
        tables.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn update_partial(
        &self,
        id: i64,
        changes: &TodoChanges,
    ) -> Result<Option<Todo>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.todos.get(&id) else {
            return Ok(None);
        };
        let (title, group_id) = changes.effective_key(current);
        if tables.collides(title, group_id, Some(id)) {
            return Err(StoreError::DuplicateTitle);
        }
        let Some(todo) = tables.todos.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(todo);
        todo.updated_at = Utc::now();
        Ok(Some(todo.clone()))
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.todos.remove(&id).is_some())
    }

    async fn group_exists(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.groups.contains_key(&id))
    }
}
