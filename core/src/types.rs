//! Domain types for the todo service.
//!
//! # Design
//! `Todo` is the record as the store hands it back. `NewTodo` and
//! `TodoChanges` are the write-side shapes, built only from payloads that
//! already passed the validation schema, so they carry typed values rather
//! than raw JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::validation::{as_bool, as_id};

/// A single todo item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    pub group_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A group that todos may belong to. Only its existence matters here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query filter for listing todos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TodoFilter {
    pub group_id: Option<i64>,
}

impl TodoFilter {
    pub fn matches(&self, todo: &Todo) -> bool {
        match self.group_id {
            Some(group_id) => todo.group_id == Some(group_id),
            None => true,
        }
    }
}

/// Insert payload. `completed` always starts out `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub group_id: Option<i64>,
}

impl NewTodo {
    /// Build from a payload that passed `Schema::create_todo`.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        Self {
            title: payload
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string(),
            group_id: payload.get("group_id").and_then(as_id),
        }
    }
}

/// Partial update. Only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub group_id: Option<i64>,
}

impl TodoChanges {
    /// Build from a payload that passed `Schema::update_todo`. Keys other than
    /// `title`, `completed` and `group_id` are ignored.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        Self {
            title: payload
                .get("title")
                .and_then(Value::as_str)
                .map(|title| title.trim().to_string()),
            completed: payload.get("completed").and_then(as_bool),
            group_id: payload.get("group_id").and_then(as_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none() && self.group_id.is_none()
    }

    /// Whether applying these changes would alter any stored field of `todo`.
    pub fn is_dirty(&self, todo: &Todo) -> bool {
        self.title.as_ref().is_some_and(|title| *title != todo.title)
            || self.completed.is_some_and(|completed| completed != todo.completed)
            || self.group_id.is_some_and(|group_id| Some(group_id) != todo.group_id)
    }

    /// The `(title, group_id)` pair the record would have after the update.
    pub fn effective_key<'a>(&'a self, todo: &'a Todo) -> (&'a str, Option<i64>) {
        (
            self.title.as_deref().unwrap_or(&todo.title),
            self.group_id.or(todo.group_id),
        )
    }

    /// Apply the changes to `todo` in place, leaving timestamps alone.
    pub fn apply(&self, todo: &mut Todo) {
        if let Some(title) = &self.title {
            todo.title = title.clone();
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(group_id) = self.group_id {
            todo.group_id = Some(group_id);
        }
    }
}
