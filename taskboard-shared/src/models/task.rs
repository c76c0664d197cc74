/// Task model
///
/// Tasks belong to exactly one project, move across the board by status, and
/// own their comments and attachments.
///
/// # Status
///
/// ```text
/// To Do → In Progress → Under Review → Completed
/// ```
///
/// Any status can be dropped onto any other column; the board imposes no
/// ordering. A status string the client does not know is kept verbatim as
/// [`TaskStatus::Unrecognized`] so the task still shows up (in the board's
/// Unsorted column) instead of vanishing.
///
/// # Tags
///
/// Tags travel as one comma-joined string (`"frontend,bug"`); use
/// [`Task::tag_list`] to split them and [`join_tags`] to build the string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::attachment::Attachment;
use super::comment::Comment;
use super::user::User;

/// Known task statuses, one per board column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "To Do")]
    ToDo,

    #[serde(rename = "In Progress")]
    InProgress,

    #[serde(rename = "Under Review")]
    UnderReview,

    Completed,
}

impl Status {
    /// Board column order
    pub const ALL: [Status; 4] = [
        Status::ToDo,
        Status::InProgress,
        Status::UnderReview,
        Status::Completed,
    ];

    /// Converts status to its wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::ToDo => "To Do",
            Status::InProgress => "In Progress",
            Status::UnderReview => "Under Review",
            Status::Completed => "Completed",
        }
    }

    /// Parses a wire string, returning `None` for anything unknown
    pub fn parse(value: &str) -> Option<Self> {
        Status::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status as read from the server
///
/// Unknown values are preserved rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Known(Status),
    Unrecognized(String),
}

impl TaskStatus {
    /// Returns the known status, if any
    pub fn known(&self) -> Option<Status> {
        match self {
            TaskStatus::Known(status) => Some(*status),
            TaskStatus::Unrecognized(_) => None,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match Status::parse(&value) {
            Some(status) => TaskStatus::Known(status),
            None => TaskStatus::Unrecognized(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        match value {
            TaskStatus::Known(status) => status.as_str().to_string(),
            TaskStatus::Unrecognized(raw) => raw,
        }
    }
}

impl From<Status> for TaskStatus {
    fn from(value: Status) -> Self {
        TaskStatus::Known(value)
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Backlog,
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Backlog => "Backlog",
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

/// Task as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Current status (may be missing on legacy rows)
    #[serde(default)]
    pub status: Option<TaskStatus>,

    #[serde(default)]
    pub priority: Option<Priority>,

    /// Comma-joined tag list
    #[serde(default)]
    pub tags: Option<String>,

    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub points: Option<i32>,

    pub project_id: i64,

    #[serde(default)]
    pub author_user_id: Option<i64>,

    #[serde(default)]
    pub assigned_user_id: Option<i64>,

    #[serde(default)]
    pub author: Option<User>,

    #[serde(default)]
    pub assignee: Option<User>,

    #[serde(default)]
    pub comments: Vec<Comment>,

    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Task {
    /// Splits the comma-joined tag string, preserving order
    pub fn tag_list(&self) -> Vec<String> {
        split_tags(self.tags.as_deref())
    }

    /// Known status of the task, if it has one
    pub fn known_status(&self) -> Option<Status> {
        self.status.as_ref().and_then(TaskStatus::known)
    }
}

/// Splits a comma-joined tag string into its parts in original order
pub fn split_tags(tags: Option<&str>) -> Vec<String> {
    match tags {
        Some(raw) if !raw.is_empty() => raw.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

/// Joins tags into the wire representation
pub fn join_tags<S: AsRef<str>>(tags: &[S]) -> String {
    tags.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",")
}

/// Input for creating a new task (`POST /tasks`)
///
/// Status is restricted to the known values; an unrecognized status can never
/// be created from this client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_status")]
    pub status: Status,

    #[serde(default = "default_priority")]
    pub priority: Priority,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_user_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<i64>,

    pub project_id: i64,
}

fn default_status() -> Status {
    Status::ToDo
}

fn default_priority() -> Priority {
    Priority::Medium
}

impl NewTask {
    /// Creates a task input with the form defaults (To Do, Medium)
    pub fn new(project_id: i64, title: impl Into<String>) -> Self {
        NewTask {
            title: title.into(),
            description: None,
            status: default_status(),
            priority: default_priority(),
            tags: None,
            start_date: None,
            due_date: None,
            points: None,
            author_user_id: None,
            assigned_user_id: None,
            project_id,
        }
    }
}

/// Body of `PATCH /tasks/<id>/status`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: Status,
}
