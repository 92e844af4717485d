//! `PostgreSQL` repository implementation.
//!
//! Items are stored as JSONB documents, one row per item, using `sqlx`
//! for database operations.
//!
//! # Features
//!
//! - Connection pooling with `sqlx::PgPool`
//! - JSONB document storage; partial updates are a single `data || patch`
//!   statement, so a merge is atomic per row
//! - Schema-level `CHECK` rejecting documents with an empty `task`
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS todos (
//!     id UUID PRIMARY KEY,
//!     data JSONB NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     CONSTRAINT todos_task_present CHECK (length(trim(data->>'task')) > 0)
//! );
//! ```

use futures::FutureExt;
use sqlx::PgPool;

use crate::domain::{NewTodo, TodoId, TodoItem, TodoPatch};
use crate::infrastructure::{RepositoryError, RepositoryFuture, TodoRepository};

/// DDL applied by [`PostgresTodoRepository::ensure_schema`].
const CREATE_TODOS_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS todos (
    id UUID PRIMARY KEY,
    data JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT todos_task_present CHECK (length(trim(data->>'task')) > 0)
)";

/// SQLSTATE for `check_violation`.
const CHECK_VIOLATION: &str = "23514";

/// Maps a `sqlx` error to a `RepositoryError`.
///
/// Check-constraint failures surface as `ConstraintViolation` so the API can
/// answer them as client errors.
fn map_database_error(error: &sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(database_error) = error
        && database_error.code().as_deref() == Some(CHECK_VIOLATION)
    {
        return RepositoryError::ConstraintViolation(database_error.message().to_string());
    }
    RepositoryError::DatabaseError(error.to_string())
}

/// Decodes a stored JSONB document into a `TodoItem`.
fn decode_document(data: serde_json::Value) -> Result<TodoItem, RepositoryError> {
    serde_json::from_value(data)
        .map_err(|error| RepositoryError::SerializationError(error.to_string()))
}

/// Encodes a value into a JSONB document.
fn encode_document<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(value)
        .map_err(|error| RepositoryError::SerializationError(error.to_string()))
}

/// `PostgreSQL` implementation of `TodoRepository`.
///
/// # Example
///
/// ```ignore
/// use todo_service::infrastructure::PostgresTodoRepository;
///
/// let pool = PgPool::connect("postgres://localhost/todos").await?;
/// let repository = PostgresTodoRepository::new(pool);
/// repository.ensure_schema().await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresTodoRepository {
    /// Connection pool for `PostgreSQL`.
    pool: PgPool,
}

impl PostgresTodoRepository {
    /// Creates a new `PostgreSQL` repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `todos` table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DatabaseError` if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(CREATE_TODOS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|error| map_database_error(&error))?;
        Ok(())
    }
}

impl TodoRepository for PostgresTodoRepository {
    fn list(&self) -> RepositoryFuture<Vec<TodoItem>> {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<(serde_json::Value,)> =
                sqlx::query_as("SELECT data FROM todos ORDER BY created_at, id")
                    .fetch_all(&pool)
                    .await
                    .map_err(|error| map_database_error(&error))?;

            rows.into_iter().map(|(data,)| decode_document(data)).collect()
        }
        .boxed()
    }

    fn create(&self, new_todo: NewTodo) -> RepositoryFuture<TodoItem> {
        let pool = self.pool.clone();
        async move {
            let item = TodoItem::create(TodoId::generate(), new_todo);
            let data = encode_document(&item)?;

            sqlx::query("INSERT INTO todos (id, data, created_at, updated_at) VALUES ($1, $2, NOW(), NOW())")
                .bind(item.id.as_uuid())
                .bind(&data)
                .execute(&pool)
                .await
                .map_err(|error| map_database_error(&error))?;

            Ok(item)
        }
        .boxed()
    }

    fn update(&self, id: &TodoId, patch: &TodoPatch) -> RepositoryFuture<Option<TodoItem>> {
        let pool = self.pool.clone();
        let id = *id;
        let patch = encode_document(patch);
        async move {
            let patch = patch?;
            let row: Option<(serde_json::Value,)> = sqlx::query_as(
                "UPDATE todos SET data = data || $2::jsonb, updated_at = NOW() \
                 WHERE id = $1 RETURNING data",
            )
            .bind(id.as_uuid())
            .bind(&patch)
            .fetch_optional(&pool)
            .await
            .map_err(|error| map_database_error(&error))?;

            row.map(|(data,)| decode_document(data)).transpose()
        }
        .boxed()
    }

    fn delete(&self, id: &TodoId) -> RepositoryFuture<bool> {
        let pool = self.pool.clone();
        let id = *id;
        async move {
            let result = sqlx::query("DELETE FROM todos WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&pool)
                .await
                .map_err(|error| map_database_error(&error))?;

            Ok(result.rows_affected() > 0)
        }
        .boxed()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_decode_document() {
        let id = TodoId::generate();
        let data = serde_json::json!({ "id": id.to_string(), "task": "Write report", "completed": true });

        let item = decode_document(data).unwrap();

        assert_eq!(item.id, id);
        assert_eq!(item.task, "Write report");
        assert!(item.completed);
    }

    #[rstest]
    fn test_decode_document_missing_task() {
        let data = serde_json::json!({ "id": TodoId::generate().to_string(), "completed": false });
        let error = decode_document(data).unwrap_err();
        assert!(matches!(error, RepositoryError::SerializationError(_)));
    }

    #[rstest]
    fn test_encode_patch_is_merge_document() {
        let patch = TodoPatch {
            task: Some("Renamed".to_string()),
            completed: None,
        };
        assert_eq!(
            encode_document(&patch).unwrap(),
            serde_json::json!({ "task": "Renamed" })
        );
    }

    #[rstest]
    fn test_non_database_error_maps_to_database_error() {
        let error = map_database_error(&sqlx::Error::PoolTimedOut);
        assert!(matches!(error, RepositoryError::DatabaseError(_)));
    }

    #[rstest]
    fn test_schema_enforces_task_presence() {
        assert!(CREATE_TODOS_TABLE.contains("CHECK (length(trim(data->>'task')) > 0)"));
    }
}
