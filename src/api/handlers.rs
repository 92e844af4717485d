//! HTTP handlers for the todo API.
//!
//! Each handler validates its input, performs exactly one repository call,
//! and maps the outcome to a response. There is no other business logic.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::dto::{
    CreateTodoRequest, MessageResponse, UpdateTodoRequest, parse_todo_id,
};
use super::error::ApiErrorResponse;
use super::extract::ApiJson;
use crate::domain::TodoItem;
use crate::infrastructure::{InMemoryTodoRepository, SharedTodoRepository};

/// Confirmation message returned by delete.
pub const TODO_DELETED_MESSAGE: &str = "Todo deleted";

// =============================================================================
// Application State
// =============================================================================

/// Shared application dependencies.
///
/// Holds the store handle created once at startup. Uses a trait object so
/// the backend is chosen at runtime and tests can substitute their own.
#[derive(Clone)]
pub struct AppState {
    /// Store for todo items.
    pub todo_repository: SharedTodoRepository,
}

impl AppState {
    /// Creates a new `AppState` around an initialized repository.
    #[must_use]
    pub fn new(todo_repository: SharedTodoRepository) -> Self {
        Self { todo_repository }
    }

    /// Creates an `AppState` backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryTodoRepository::new()))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AppState")
            .field("todo_repository", &"Arc<dyn TodoRepository>")
            .finish()
    }
}

// =============================================================================
// GET /todos Handler
// =============================================================================

/// Lists all todo items.
///
/// # Response
///
/// - **200 OK**: JSON array of items (possibly empty)
/// - **500 Internal Server Error**: Store failure
///
/// # Errors
///
/// Returns [`ApiErrorResponse`] if the store cannot be read.
pub async fn list_todos(
    State(state): State<AppState>,
) -> Result<Json<Vec<TodoItem>>, ApiErrorResponse> {
    let items = state.todo_repository.list().await?;
    tracing::debug!(count = items.len(), "Listed todos");
    Ok(Json(items))
}

// =============================================================================
// POST /todos Handler
// =============================================================================

/// Creates a todo item.
///
/// # Request Body
///
/// ```json
/// { "task": "Buy milk", "completed": false }
/// ```
///
/// # Response
///
/// - **201 Created**: The stored item including its id
/// - **400 Bad Request**: Missing/blank `task` or malformed body
/// - **500 Internal Server Error**: Store failure
///
/// # Errors
///
/// Returns [`ApiErrorResponse`] on validation or store failure. Nothing is
/// persisted when validation fails.
pub async fn create_todo(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoItem>), ApiErrorResponse> {
    let new_todo = request.validate()?;
    let item = state.todo_repository.create(new_todo).await?;
    tracing::info!(todo_id = %item.id, "Created todo");
    Ok((StatusCode::CREATED, Json(item)))
}

// =============================================================================
// PUT /todos/{id} Handler
// =============================================================================

/// Applies a partial update to a todo item.
///
/// # Request Body
///
/// Any subset of `{ "task": "...", "completed": true }`.
///
/// # Response
///
/// - **200 OK**: The item after the merge
/// - **400 Bad Request**: Malformed id, blank `task`, or malformed body
/// - **404 Not Found**: No item has this id
/// - **500 Internal Server Error**: Store failure
///
/// # Errors
///
/// Returns [`ApiErrorResponse`] in the cases above.
pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateTodoRequest>,
) -> Result<Json<TodoItem>, ApiErrorResponse> {
    let todo_id = parse_todo_id(&id)?;
    let patch = request.validate()?;

    let item = state
        .todo_repository
        .update(&todo_id, &patch)
        .await?
        .ok_or_else(|| ApiErrorResponse::not_found(format!("Todo not found: {todo_id}")))?;

    tracing::info!(todo_id = %item.id, completed = item.completed, "Updated todo");
    Ok(Json(item))
}

// =============================================================================
// DELETE /todos/{id} Handler
// =============================================================================

/// Deletes a todo item.
///
/// Deleting an id that does not exist is answered like a successful delete.
///
/// # Response
///
/// - **200 OK**: `{ "message": "Todo deleted" }`
/// - **400 Bad Request**: Malformed id
/// - **500 Internal Server Error**: Store failure
///
/// # Errors
///
/// Returns [`ApiErrorResponse`] on malformed id or store failure.
pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiErrorResponse> {
    let todo_id = parse_todo_id(&id)?;
    let existed = state.todo_repository.delete(&todo_id).await?;
    tracing::debug!(todo_id = %todo_id, existed, "Deleted todo");
    Ok(Json(MessageResponse::new(TODO_DELETED_MESSAGE)))
}

// =============================================================================
// GET /health Handler
// =============================================================================

/// Health check response body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Health check endpoint.
///
/// Does not touch the store.
///
/// ```json
/// { "status": "ok", "version": "0.1.0" }
/// ```
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// =============================================================================
// Tests
// =============================================================================
