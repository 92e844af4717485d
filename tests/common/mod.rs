//! Common test helpers for integration tests.
//!
//! Each integration test file is its own crate, so helpers used by only
//! some of them would otherwise warn as dead code.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use futures::FutureExt;

use todo_service::api::{ApiJson, AppState, CreateTodoRequest, create_todo};
use todo_service::domain::{NewTodo, TodoId, TodoItem, TodoPatch};
use todo_service::infrastructure::{RepositoryError, RepositoryFuture, TodoRepository};

// =============================================================================
// AppState Creation Helpers
// =============================================================================

/// Creates a test `AppState` backed by a fresh in-memory store.
pub fn create_test_app_state() -> AppState {
    AppState::in_memory()
}

/// Creates an `AppState` whose store fails every call with `message`.
pub fn create_failing_app_state(message: &str) -> AppState {
    AppState::new(Arc::new(FailingTodoRepository::new(message)))
}

/// Creates an item through the create handler and returns it.
pub async fn create_and_save_todo(state: &AppState, task: &str) -> TodoItem {
    let (_, Json(item)) = create_todo(State(state.clone()), ApiJson(CreateTodoRequest::new(task)))
        .await
        .unwrap();
    item
}

// =============================================================================
// Failing Repository
// =============================================================================

/// Store double that answers every call with `RepositoryError::DatabaseError`.
#[derive(Debug, Clone)]
pub struct FailingTodoRepository {
    message: String,
}

impl FailingTodoRepository {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn fail<T: Send + 'static>(&self) -> RepositoryFuture<T> {
        let error = RepositoryError::DatabaseError(self.message.clone());
        async move { Err(error) }.boxed()
    }
}

impl TodoRepository for FailingTodoRepository {
    fn list(&self) -> RepositoryFuture<Vec<TodoItem>> {
        self.fail()
    }

    fn create(&self, _new_todo: NewTodo) -> RepositoryFuture<TodoItem> {
        self.fail()
    }

    fn update(&self, _id: &TodoId, _patch: &TodoPatch) -> RepositoryFuture<Option<TodoItem>> {
        self.fail()
    }

    fn delete(&self, _id: &TodoId) -> RepositoryFuture<bool> {
        self.fail()
    }
}
