//! Concurrent writers against the in-memory store.
//!
//! # Design
//! The service checks for a duplicate title and then inserts, which are two
//! separate store calls. These tests race many writers through that gap and
//! verify the store's own constraint still leaves exactly one winner.

use std::sync::Arc;

use serde_json::json;
use todo_core::{MemoryTodoStore, TodoError, TodoFilter, TodoService};

async fn service() -> TodoService {
    let store = MemoryTodoStore::new();
    store.ensure_group("Groceries").await;
    TodoService::new(Arc::new(store))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_leave_one_winner() {
    let service = service().await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create(&json!({"title": "Buy milk", "group_id": 1}))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(TodoError::DuplicateTitle) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, 15);
    assert_eq!(service.list(TodoFilter::default()).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_renames_leave_one_winner() {
    let service = service().await;
    let mut ids = Vec::new();
    for n in 0..8 {
        let todo = service
            .create(&json!({"title": format!("Task {n}"), "group_id": 1}))
            .await
            .unwrap();
        ids.push(todo.id);
    }

    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let service = service.clone();
            tokio::spawn(async move { service.update(id, &json!({"title": "Same"})).await })
        })
        .collect();

    let mut renamed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(todo) => {
                assert_eq!(todo.title, "Same");
                renamed += 1;
            }
            Err(TodoError::DuplicateTitle) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(renamed, 1);
    let same = service
        .list(TodoFilter::default())
        .await
        .unwrap()
        .into_iter()
        .filter(|todo| todo.title == "Same")
        .count();
    assert_eq!(same, 1);
}
