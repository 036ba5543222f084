//! Task wire types.
//!
//! A task's `limit` is carried as a UTC instant in [`crate::limit`] format
//! and held as a [`chrono::DateTime<Utc>`] once decoded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::TaskId;

/// A unit of work belonging to exactly one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// Display title.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub detail: String,
    /// Completion flag.
    #[serde(default)]
    pub done: bool,
    /// Optional due date.
    #[serde(
        default,
        with = "crate::limit::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<DateTime<Utc>>,
}

/// Body of `POST /lists/{id}/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBody {
    /// Display title.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub detail: String,
    /// Completion flag.
    #[serde(default)]
    pub done: bool,
    /// Optional due date, omitted when unset.
    #[serde(
        default,
        with = "crate::limit::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<DateTime<Utc>>,
}

impl TaskBody {
    /// Attaches the server-assigned id.
    #[must_use]
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            detail: self.detail,
            done: self.done,
            limit: self.limit,
        }
    }
}

impl From<&Task> for TaskBody {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            detail: task.detail.clone(),
            done: task.done,
            limit: task.limit,
        }
    }
}

/// Body of `PUT /lists/{id}/tasks/{task}`.
///
/// Keys left out keep their stored value. The client always sends every
/// field of the merged task, with `"limit": null` when the due date is
/// cleared, so the server ends up holding exactly what the client cached.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// New completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    /// `Some(None)` clears the due date.
    #[serde(
        default,
        with = "crate::limit::patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    /// Writes the fields this patch carries onto `task`.
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(detail) = self.detail {
            task.detail = detail;
        }
        if let Some(done) = self.done {
            task.done = done;
        }
        if let Some(limit) = self.limit {
            task.limit = limit;
        }
    }
}

impl From<&Task> for TaskPatch {
    fn from(task: &Task) -> Self {
        Self {
            title: Some(task.title.clone()),
            detail: Some(task.detail.clone()),
            done: Some(task.done),
            limit: Some(task.limit),
        }
    }
}

/// Response body of `GET /lists/{id}/tasks`.
///
/// A missing or `null` `tasks` field reads as an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasksEnvelope {
    /// Tasks of the requested list, in server order.
    #[serde(default)]
    pub tasks: Option<Vec<Task>>,
}

impl TasksEnvelope {
    /// Unwraps the task sequence, defaulting to empty.
    #[must_use]
    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks.unwrap_or_default()
    }
}
