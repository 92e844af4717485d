//! Todo domain model.
//!
//! A todo item is the single persisted entity of the service. The store
//! assigns its identifier; only `task` and `completed` are ever changed,
//! and only through a [`TodoPatch`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Value Objects - Newtypes
// =============================================================================

/// Unique identifier for a todo item.
///
/// This is a newtype wrapper around UUID to provide type safety.
/// Serialized as the plain UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TodoId(Uuid);

impl TodoId {
    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Generates a new time-ordered `TodoId` (UUID v7).
    ///
    /// **Note**: This is an impure function (side effect: time + random).
    /// Only stores call it, at creation time.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for TodoId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A single to-do entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Identifier assigned by the store.
    pub id: TodoId,
    /// Non-empty description of the work.
    pub task: String,
    /// Whether the entry has been done.
    #[serde(default)]
    pub completed: bool,
}

impl TodoItem {
    /// Materializes a validated [`NewTodo`] under a store-assigned id.
    #[must_use]
    pub fn create(id: TodoId, new_todo: NewTodo) -> Self {
        Self {
            id,
            task: new_todo.task,
            completed: new_todo.completed,
        }
    }

    /// Returns a copy of this item with the fields present in `patch`
    /// replaced. Fields absent from the patch keep their current value.
    #[must_use]
    pub fn apply(&self, patch: &TodoPatch) -> Self {
        Self {
            id: self.id,
            task: patch.task.clone().unwrap_or_else(|| self.task.clone()),
            completed: patch.completed.unwrap_or(self.completed),
        }
    }
}

/// Validated input for creating a todo item.
///
/// Obtained from `CreateTodoRequest::validate`; `task` is guaranteed to
/// contain a non-whitespace character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    /// Description of the work.
    pub task: String,
    /// Initial completion flag.
    pub completed: bool,
}

/// Partial field set applied by an update.
///
/// Serializes only the present fields, so the JSON form doubles as a
/// document merge patch for the stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    /// Replacement description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Replacement completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    /// Returns a patch that only sets `completed`.
    #[must_use]
    pub const fn completed(completed: bool) -> Self {
        Self {
            task: None,
            completed: Some(completed),
        }
    }

    /// Returns true if the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.task.is_none() && self.completed.is_none()
    }
}

// =============================================================================
// Tests
// =============================================================================
