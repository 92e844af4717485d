//! Repository trait for todo items.
//!
//! Every method returns a boxed `'static` future: the implementation captures
//! what it needs (pool handle, cloned id, patch) up front, so callers can
//! hold the future across await points without borrowing the repository.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::{NewTodo, TodoId, TodoItem, TodoPatch};

// =============================================================================
// Repository Error
// =============================================================================

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The store rejected the document (schema-level constraint).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// `PostgreSQL` connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Redis connection or command error.
    #[error("Redis error: {0}")]
    RedisError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Future returned by every [`TodoRepository`] method.
pub type RepositoryFuture<T> = BoxFuture<'static, Result<T, RepositoryError>>;

// =============================================================================
// Todo Repository
// =============================================================================

/// Repository trait for todo items.
///
/// Each call is a single round trip to the backing store. Implementations
/// must make `update` an atomic merge so that concurrent updates to the same
/// id resolve last-writer-wins without tearing fields.
///
/// # Example
///
/// ```ignore
/// let created = repository.create(new_todo).await?;
/// let updated = repository.update(&created.id, &TodoPatch::completed(true)).await?;
/// ```
pub trait TodoRepository: Send + Sync {
    /// Lists every stored item in store-native order.
    fn list(&self) -> RepositoryFuture<Vec<TodoItem>>;

    /// Stores a new item under a freshly generated id and returns it.
    fn create(&self, new_todo: NewTodo) -> RepositoryFuture<TodoItem>;

    /// Merges `patch` into the item with the given id.
    ///
    /// Returns `Ok(Some(item))` with the post-merge item, or `Ok(None)` if
    /// no item has that id. Never creates an item.
    fn update(&self, id: &TodoId, patch: &TodoPatch) -> RepositoryFuture<Option<TodoItem>>;

    /// Deletes the item with the given id.
    ///
    /// Returns `Ok(true)` if the item was deleted, `Ok(false)` if it didn't exist.
    fn delete(&self, id: &TodoId) -> RepositoryFuture<bool>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        RepositoryError::ConstraintViolation("task must not be empty".to_string()),
        "Constraint violation: task must not be empty"
    )]
    #[case(
        RepositoryError::DatabaseError("connection refused".to_string()),
        "Database error: connection refused"
    )]
    #[case(
        RepositoryError::RedisError("pool timed out".to_string()),
        "Redis error: pool timed out"
    )]
    #[case(
        RepositoryError::SerializationError("missing field `task`".to_string()),
        "Serialization error: missing field `task`"
    )]
    fn test_repository_error_display(#[case] error: RepositoryError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }
}
