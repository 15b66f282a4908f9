//! SQLite-backed `TodoStore`.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE "groups" (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     name TEXT NOT NULL,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//!
//! CREATE TABLE todos (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     title TEXT NOT NULL,
//!     completed BOOLEAN NOT NULL DEFAULT 0,
//!     group_id INTEGER REFERENCES "groups" (id),
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     UNIQUE (group_id, title)
//! );
//! ```
//!
//! The `UNIQUE (group_id, title)` index is what actually guarantees one title
//! per group when writers race; violations come back as
//! `StoreError::DuplicateTitle`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use todo_core::{Group, NewTodo, StoreError, Todo, TodoChanges, TodoFilter, TodoStore};

const TODO_COLUMNS: &str = "id, title, completed, group_id, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct TodoRow {
    id: i64,
    title: String,
    completed: bool,
    group_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Todo {
            id: row.id,
            title: row.title,
            completed: row.completed,
            group_id: row.group_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteTodoStore {
    pool: SqlitePool,
}

impl SqliteTodoStore {
    /// Open (creating if missing) the database at `url` and ensure the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(StoreError::backend)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(StoreError::backend)?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!(url, max_connections, "sqlite store ready");
        Ok(store)
    }

    /// A private in-memory database. Every connection to `sqlite::memory:`
    /// sees its own database, so the pool is pinned to one connection that is
    /// never recycled.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(StoreError::backend)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StoreError::backend)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS "groups" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                completed BOOLEAN NOT NULL DEFAULT 0,
                group_id INTEGER REFERENCES "groups" (id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (group_id, title)
            )"#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_todos_group_id ON todos (group_id)")
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(())
    }

    /// Return the group called `name`, creating it first if needed.
    pub async fn ensure_group(&self, name: &str) -> Result<Group, StoreError> {
        let existing: Option<GroupRow> = sqlx::query_as(
            r#"SELECT id, name, created_at, updated_at FROM "groups" WHERE name = ? ORDER BY id LIMIT 1"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        if let Some(row) = existing {
            return Ok(row.into());
        }

        let now = Utc::now();
        let row: GroupRow = sqlx::query_as(
            r#"INSERT INTO "groups" (name, created_at, updated_at) VALUES (?, ?, ?)
               RETURNING id, name, created_at, updated_at"#,
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        tracing::debug!(id = row.id, name, "created group");
        Ok(row.into())
    }
}

/// Unique-index violations on `todos` mean a title collision in a group.
fn write_error(error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::Database(database) if database.is_unique_violation() => {
            StoreError::DuplicateTitle
        }
        _ => StoreError::backend(error),
    }
}

#[async_trait]
impl TodoStore for SqliteTodoStore {
    async fn find(&self, id: i64) -> Result<Option<Todo>, StoreError> {
        let row: Option<TodoRow> =
            sqlx::query_as(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::backend)?;
        Ok(row.map(Todo::from))
    }

    async fn find_filtered(&self, filter: TodoFilter) -> Result<Vec<Todo>, StoreError> {
        let rows: Vec<TodoRow> = match filter.group_id {
            Some(group_id) => {
                sqlx::query_as::<_, TodoRow>(&format!(
                    "SELECT {TODO_COLUMNS} FROM todos WHERE group_id = ? ORDER BY id"
                ))
                .bind(group_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, TodoRow>(&format!(
                    "SELECT {TODO_COLUMNS} FROM todos ORDER BY id"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(StoreError::backend)?;
        Ok(rows.into_iter().map(Todo::from).collect())
    }

    async fn find_duplicate(
        &self,
        title: &str,
        group_id: Option<i64>,
        excluding: Option<i64>,
    ) -> Result<Option<Todo>, StoreError> {
        // `group_id = NULL` is never true, so ungrouped rows never match.
        // `IS NOT` lets a NULL `excluding` exclude nothing.
        let row: Option<TodoRow> = sqlx::query_as(&format!(
            "SELECT {TODO_COLUMNS} FROM todos \
             WHERE title = ? AND group_id = ? AND id IS NOT ? \
             ORDER BY id LIMIT 1"
        ))
        .bind(title)
        .bind(group_id)
        .bind(excluding)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(row.map(Todo::from))
    }

    async fn insert(&self, new: NewTodo) -> Result<Todo, StoreError> {
        let now = Utc::now();
        let row: TodoRow = sqlx::query_as(&format!(
            "INSERT INTO todos (title, completed, group_id, created_at, updated_at) \
             VALUES (?, 0, ?, ?, ?) RETURNING {TODO_COLUMNS}"
        ))
        .bind(&new.title)
        .bind(new.group_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(row.into())
    }

    async fn update_partial(
        &self,
        id: i64,
        changes: &TodoChanges,
    ) -> Result<Option<Todo>, StoreError> {
        let row: Option<TodoRow> = sqlx::query_as(&format!(
            "UPDATE todos SET \
                 title = COALESCE(?, title), \
                 completed = COALESCE(?, completed), \
                 group_id = COALESCE(?, group_id), \
                 updated_at = ? \
             WHERE id = ? RETURNING {TODO_COLUMNS}"
        ))
        .bind(changes.title.as_deref())
        .bind(changes.completed)
        .bind(changes.group_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(row.map(Todo::from))
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn group_exists(&self, id: i64) -> Result<bool, StoreError> {
        sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM "groups" WHERE id = ?)"#)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)
    }
}
