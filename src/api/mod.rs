//! HTTP surface of the todo service.
//!
//! - `GET /health`
//! - `GET /todos`
//! - `POST /todos`
//! - `PUT /todos/{id}`
//! - `DELETE /todos/{id}`
//! - `GET /metrics` (when enabled)

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;

pub use dto::{CreateTodoRequest, MessageResponse, UpdateTodoRequest, parse_todo_id, validate_task};
pub use error::{ApiError, ApiErrorResponse, FieldError, ValidationError};
pub use extract::ApiJson;
pub use handlers::{
    AppState, HealthResponse, TODO_DELETED_MESSAGE, create_todo, delete_todo, health_check,
    list_todos, update_todo,
};
pub use routes::{build_router, todo_routes};
