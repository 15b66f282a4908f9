//! HTTP surface of the todo service.
//!
//! Routes:
//!
//! | Method      | Path          | Success              |
//! |-------------|---------------|----------------------|
//! | GET         | `/todos`      | 200, array of todos  |
//! | POST        | `/todos`      | 201, created todo    |
//! | PUT / PATCH | `/todos/{id}` | 200, updated todo    |
//! | DELETE      | `/todos/{id}` | 204, empty body      |
//!
//! Handlers only extract, delegate to `TodoService` and pick a status code.
//! Failures become `ApiErrorResponse`s.

pub mod config;
pub mod error;
pub mod sqlite;

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use todo_core::{MemoryTodoStore, StoreError, Todo, TodoFilter, TodoService, TodoStore};
use tower_http::trace::TraceLayer;

use crate::config::{Config, StorageMode};
use crate::error::ApiErrorResponse;
use crate::sqlite::SqliteTodoStore;

pub fn app(service: TodoService) -> Router {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            put(update_todo).patch(update_todo).delete(delete_todo),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Open the store selected by `config` and create any seed groups.
pub async fn open_store(config: &Config) -> Result<Arc<dyn TodoStore>, StoreError> {
    match config.storage_mode {
        StorageMode::Memory => {
            let store = MemoryTodoStore::new();
            for name in &config.seed_groups {
                let group = store.ensure_group(name).await;
                tracing::info!(id = group.id, name = %group.name, "group ready");
            }
            Ok(Arc::new(store))
        }
        StorageMode::Sqlite => {
            let store =
                SqliteTodoStore::connect(&config.database_url, config.max_connections).await?;
            for name in &config.seed_groups {
                let group = store.ensure_group(name).await?;
                tracing::info!(id = group.id, name = %group.name, "group ready");
            }
            Ok(Arc::new(store))
        }
    }
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn run<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn list_todos(
    State(service): State<TodoService>,
    filter: Result<Query<TodoFilter>, QueryRejection>,
) -> Result<Json<Vec<Todo>>, ApiErrorResponse> {
    let Query(filter) = filter?;
    Ok(Json(service.list(filter).await?))
}

async fn create_todo(
    State(service): State<TodoService>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiErrorResponse> {
    let Json(payload) = payload?;
    let todo = service.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(service): State<TodoService>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Todo>, ApiErrorResponse> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    Ok(Json(service.update(id, &payload).await?))
}

async fn delete_todo(
    State(service): State<TodoService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiErrorResponse> {
    let Path(id) = id?;
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_seeds_groups() {
        let config = Config {
            storage_mode: StorageMode::Memory,
            seed_groups: vec!["Groceries".to_string(), "Chores".to_string()],
            ..Config::default()
        };
        let store = open_store(&config).await.unwrap();
        assert!(store.group_exists(1).await.unwrap());
        assert!(store.group_exists(2).await.unwrap());
        assert!(!store.group_exists(3).await.unwrap());
    }

    #[tokio::test]
    async fn sqlite_store_seeds_groups_once() {
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            seed_groups: vec!["Groceries".to_string(), "Groceries".to_string()],
            ..Config::default()
        };
        let store = open_store(&config).await.unwrap();
        assert!(store.group_exists(1).await.unwrap());
        assert!(!store.group_exists(2).await.unwrap());
    }
}
