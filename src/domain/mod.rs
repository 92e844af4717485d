//! Domain module for the task list.
//!
//! This module contains the todo entity and its value objects.

pub mod todo;

pub use todo::{NewTodo, TodoId, TodoItem, TodoPatch};
