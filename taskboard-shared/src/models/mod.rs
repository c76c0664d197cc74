/// Data models for Taskboard
///
/// This module contains the entities exchanged with the Taskboard REST backend.
/// Field names follow the backend's camelCase JSON.
///
/// # Models
///
/// - `organization`: Organizations owning users
/// - `user`: User accounts and roles
/// - `project`: Projects owning tasks
/// - `task`: Tasks with status, priority and tags
/// - `comment`: Comments on tasks
/// - `credentials`: Sign-in and sign-up bodies
/// - `attachment`: File attachments on tasks
/// - `search`: Cross-entity search results
///
/// # Example
///
/// ```
/// use taskboard_shared::models::task::{Task, Status};
///
/// let task: Task = serde_json::from_str(
///     r#"{"id": 1, "title": "Ship it", "status": "In Progress", "projectId": 7}"#,
/// ).unwrap();
/// assert_eq!(task.status.as_ref().and_then(|s| s.known()), Some(Status::InProgress));
/// ```

pub mod attachment;
pub mod comment;
pub mod credentials;
pub mod organization;
pub mod project;
pub mod search;
pub mod task;
pub mod user;
