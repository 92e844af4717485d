//! Data Transfer Objects for API requests and responses.
//!
//! Request DTOs are validated here, before anything reaches the store.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use crate::domain::{NewTodo, TodoId, TodoPatch};

// =============================================================================
// Todo DTOs
// =============================================================================

/// Request DTO for creating a todo item.
///
/// `task` is optional at the serde level so that a missing field becomes a
/// `ValidationError` rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateTodoRequest {
    /// Description of the work.
    #[serde(default)]
    pub task: Option<String>,
    /// Initial completion flag (defaults to false).
    #[serde(default)]
    pub completed: Option<bool>,
}

impl CreateTodoRequest {
    /// Creates a request for the given task text.
    #[must_use]
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: Some(task.into()),
            completed: None,
        }
    }

    /// Validates the request into a [`NewTodo`].
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `task` is missing or blank.
    pub fn validate(&self) -> Result<NewTodo, ValidationError> {
        let task = self
            .task
            .as_deref()
            .ok_or_else(|| ValidationError::single("task", "Task is required"))?;

        Ok(NewTodo {
            task: validate_task(task)?,
            completed: self.completed.unwrap_or(false),
        })
    }
}

/// Request DTO for updating a todo item. Any subset of fields may be present.
///
/// Unknown fields (`id`, `_id`, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateTodoRequest {
    /// Replacement description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Replacement completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl UpdateTodoRequest {
    /// Validates the request into a [`TodoPatch`].
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `task` is present but blank.
    pub fn validate(&self) -> Result<TodoPatch, ValidationError> {
        let task = self.task.as_deref().map(validate_task).transpose()?;
        Ok(TodoPatch {
            task,
            completed: self.completed,
        })
    }
}

impl From<TodoPatch> for UpdateTodoRequest {
    fn from(patch: TodoPatch) -> Self {
        Self {
            task: patch.task,
            completed: patch.completed,
        }
    }
}

/// Confirmation body returned by delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

impl MessageResponse {
    /// Creates a new message response.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Validation Functions
// =============================================================================

/// Validates the task text.
///
/// A task consisting only of whitespace counts as missing. Accepted text is
/// returned exactly as sent.
///
/// # Errors
///
/// Returns `ValidationError` if the task is blank.
pub fn validate_task(task: &str) -> Result<String, ValidationError> {
    if task.trim().is_empty() {
        return Err(ValidationError::single("task", "Task is required"));
    }
    Ok(task.to_string())
}

/// Parses a todo id from a path segment.
///
/// # Errors
///
/// Returns `ValidationError` if the segment is not a UUID.
pub fn parse_todo_id(raw: &str) -> Result<TodoId, ValidationError> {
    raw.parse()
        .map_err(|_| ValidationError::single("id", format!("Invalid todo id: '{raw}'")))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_create_defaults_completed_to_false() {
        let validated = CreateTodoRequest::new("Buy milk").validate().unwrap();
        assert_eq!(validated.task, "Buy milk");
        assert!(!validated.completed);
    }

    #[rstest]
    fn test_create_keeps_completed() {
        let request = CreateTodoRequest {
            task: Some("Done already".to_string()),
            completed: Some(true),
        };
        assert!(request.validate().unwrap().completed);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    fn test_create_requires_task(#[case] task: Option<&str>) {
        let request = CreateTodoRequest {
            task: task.map(str::to_string),
            completed: None,
        };
        let error = request.validate().unwrap_err();
        assert_eq!(error.errors[0].field, "task");
    }

    #[rstest]
    #[case("  Walk dog \n")]
    #[case("\tIndented")]
    fn test_create_keeps_task_text_verbatim(#[case] task: &str) {
        let validated = CreateTodoRequest::new(task).validate().unwrap();
        assert_eq!(validated.task, task);
    }

    #[rstest]
    fn test_long_task_is_accepted() {
        let long = "x".repeat(10_000);
        assert_eq!(validate_task(&long).unwrap(), long);
    }

    #[rstest]
    fn test_create_request_deserializes_missing_fields() {
        let request: CreateTodoRequest = serde_json::from_str("{}").unwrap();
        assert!(request.task.is_none());
        assert!(request.completed.is_none());
    }

    #[rstest]
    fn test_update_partial_completed_only() {
        let request: UpdateTodoRequest =
            serde_json::from_str(r#"{"completed": true, "_id": "abc", "__v": 0}"#).unwrap();
        let patch = request.validate().unwrap();
        assert_eq!(patch, TodoPatch::completed(true));
    }

    #[rstest]
    fn test_update_rejects_blank_task() {
        let request = UpdateTodoRequest {
            task: Some(" ".to_string()),
            completed: None,
        };
        assert!(request.validate().is_err());
    }

    #[rstest]
    fn test_update_empty_is_empty_patch() {
        let patch = UpdateTodoRequest::default().validate().unwrap();
        assert!(patch.is_empty());
    }

    #[rstest]
    fn test_parse_todo_id() {
        let id = TodoId::generate();
        assert_eq!(parse_todo_id(&id.to_string()).unwrap(), id);

        let error = parse_todo_id("42").unwrap_err();
        assert_eq!(error.errors[0].field, "id");
    }
}
