/// Task actions the board performs against the backend
///
/// The board never talks HTTP directly. It goes through [`TaskMover`], which
/// [`TaskboardApi`] implements (so writes invalidate the cached task lists)
/// and which [`MockMover`] implements for tests and demos.

use std::sync::Mutex;

use async_trait::async_trait;
use taskboard_client::api::TaskboardApi;
use taskboard_client::error::{ClientError, ClientResult};
use taskboard_shared::models::comment::Comment;
use taskboard_shared::models::task::{Status, Task};

/// Backend operations a board card can trigger
#[async_trait]
pub trait TaskMover: Send + Sync {
    /// Sets a task's status
    async fn move_task(&self, task_id: i64, status: Status) -> ClientResult<Task>;

    /// Deletes a task
    async fn delete_task(&self, task_id: i64) -> ClientResult<()>;

    /// Adds a comment to a task
    async fn add_comment(&self, task_id: i64, text: &str) -> ClientResult<Comment>;
}

#[async_trait]
impl TaskMover for TaskboardApi {
    async fn move_task(&self, task_id: i64, status: Status) -> ClientResult<Task> {
        self.update_task_status(task_id, status).await
    }

    async fn delete_task(&self, task_id: i64) -> ClientResult<()> {
        TaskboardApi::delete_task(self, task_id).await
    }

    async fn add_comment(&self, task_id: i64, text: &str) -> ClientResult<Comment> {
        self.create_comment(task_id, text).await
    }
}

/// Call recorded by [`MockMover`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoverCall {
    Move { task_id: i64, status: Status },
    Delete { task_id: i64 },
    Comment { task_id: i64, text: String },
}

/// In-memory mover that records calls
///
/// Every call succeeds unless [`MockMover::failing`] was used.
#[derive(Debug, Default)]
pub struct MockMover {
    calls: Mutex<Vec<MoverCall>>,
    fail_with: Option<ClientError>,
}

impl MockMover {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mover whose every call fails with `error`
    pub fn failing(error: ClientError) -> Self {
        MockMover {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(error),
        }
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<MoverCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: MoverCall) -> ClientResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TaskMover for MockMover {
    async fn move_task(&self, task_id: i64, status: Status) -> ClientResult<Task> {
        self.record(MoverCall::Move { task_id, status })?;
        Ok(Task {
            id: task_id,
            title: format!("Task {}", task_id),
            description: None,
            status: Some(status.into()),
            priority: None,
            tags: None,
            start_date: None,
            due_date: None,
            points: None,
            project_id: 0,
            author_user_id: None,
            assigned_user_id: None,
            author: None,
            assignee: None,
            comments: Vec::new(),
            attachments: Vec::new(),
        })
    }

    async fn delete_task(&self, task_id: i64) -> ClientResult<()> {
        self.record(MoverCall::Delete { task_id })
    }

    async fn add_comment(&self, task_id: i64, text: &str) -> ClientResult<Comment> {
        self.record(MoverCall::Comment {
            task_id,
            text: text.to_string(),
        })?;
        Ok(Comment {
            id: 1,
            text: text.to_string(),
            task_id,
            user_id: 0,
        })
    }
}
