//! In-memory repository implementation.
//!
//! Suitable for tests and local development. Items live in a `BTreeMap`
//! keyed by their UUIDv7 id, so iteration order is creation order.
//!
//! # Features
//!
//! - Thread-safe with `Arc<RwLock<...>>`
//! - Every operation takes the lock exactly once, so a merge is atomic
//! - All operations return boxed `'static` futures

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::RwLock;

use crate::domain::{NewTodo, TodoId, TodoItem, TodoPatch};
use crate::infrastructure::{RepositoryFuture, TodoRepository};

/// In-memory implementation of `TodoRepository`.
///
/// # Example
///
/// ```ignore
/// use todo_service::infrastructure::InMemoryTodoRepository;
///
/// let repository = InMemoryTodoRepository::new();
/// let item = repository.create(new_todo).await?;
/// let all = repository.list().await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryTodoRepository {
    items: Arc<RwLock<BTreeMap<TodoId, TodoItem>>>,
}

impl InMemoryTodoRepository {
    /// Creates a new empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[allow(clippy::significant_drop_tightening)]
impl TodoRepository for InMemoryTodoRepository {
    fn list(&self) -> RepositoryFuture<Vec<TodoItem>> {
        let items = Arc::clone(&self.items);
        async move {
            let guard = items.read().await;
            Ok(guard.values().cloned().collect())
        }
        .boxed()
    }

    fn create(&self, new_todo: NewTodo) -> RepositoryFuture<TodoItem> {
        let items = Arc::clone(&self.items);
        async move {
            let item = TodoItem::create(TodoId::generate(), new_todo);
            let mut guard = items.write().await;
            guard.insert(item.id, item.clone());
            Ok(item)
        }
        .boxed()
    }

    fn update(&self, id: &TodoId, patch: &TodoPatch) -> RepositoryFuture<Option<TodoItem>> {
        let items = Arc::clone(&self.items);
        let id = *id;
        let patch = patch.clone();
        async move {
            let mut guard = items.write().await;
            let Some(existing) = guard.get_mut(&id) else {
                return Ok(None);
            };
            *existing = existing.apply(&patch);
            Ok(Some(existing.clone()))
        }
        .boxed()
    }

    fn delete(&self, id: &TodoId) -> RepositoryFuture<bool> {
        let items = Arc::clone(&self.items);
        let id = *id;
        async move {
            let mut guard = items.write().await;
            Ok(guard.remove(&id).is_some())
        }
        .boxed()
    }
}

// =============================================================================
// Tests
// =============================================================================
