//! Task domain model.
//!
//! # Responsibility
//! - Define the single task record exchanged with the remote `/todos` API.
//! - Validate user-supplied titles before they leave the process.
//!
//! # Invariants
//! - `id` is assigned by the remote backend and never generated locally.
//! - `title` is non-empty after trimming.
//! - Task ids are unique within one in-memory list.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Opaque server-assigned task identifier.
///
/// Backends disagree on whether ids are JSON strings or numbers; both forms
/// deserialize into the same textual id so lookups never depend on the wire
/// representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum WireId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match WireId::deserialize(deserializer)? {
            WireId::Text(value) => Self(value),
            WireId::Signed(value) => Self(value.to_string()),
            WireId::Unsigned(value) => Self(value.to_string()),
        })
    }
}

/// A to-do item as returned by the remote backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, completed: bool) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            completed,
        }
    }
}

/// Request body for `POST /todos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub title: String,
    pub completed: bool,
}

impl NewTask {
    /// Builds a create request from raw user input.
    ///
    /// The title is trimmed; new tasks always start incomplete.
    pub fn from_input(title: &str) -> Result<Self, TaskValidationError> {
        let title = normalize_title(title)?;
        Ok(Self {
            title,
            completed: false,
        })
    }
}

/// Request body for `PUT /todos/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionPatch {
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskValidationError {
    #[error("task title cannot be empty")]
    EmptyTitle,
}

/// Trims user input and rejects titles that are blank.
pub fn normalize_title(title: &str) -> Result<String, TaskValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

/// Drops later entries whose id was already seen, keeping list order.
///
/// Returns the ids that were dropped so callers can report them.
pub fn dedupe_by_id(tasks: &mut Vec<Task>) -> Vec<TaskId> {
    let mut seen = HashSet::with_capacity(tasks.len());
    let mut dropped = Vec::new();
    tasks.retain(|task| {
        if seen.insert(task.id.clone()) {
            true
        } else {
            dropped.push(task.id.clone());
            false
        }
    });
    dropped
}
