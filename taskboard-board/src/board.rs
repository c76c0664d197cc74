/// Board orchestrator
///
/// Ties the drag-state machine to the session role and the backend. A drop
/// over a column issues exactly one status mutation; its outcome is reported
/// on the board's event stream. Nothing is moved optimistically: columns are
/// re-derived from the refetched task list, so a failed move needs no
/// rollback, only a [`BoardEvent::MoveFailed`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_board::board::Board;
/// use taskboard_board::columns::BoardColumn;
/// use taskboard_board::mover::MockMover;
/// use taskboard_shared::models::task::Status;
/// use taskboard_shared::session::{MemoryPersistence, SessionStore};
/// use tokio_stream::StreamExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = SessionStore::load(Arc::new(MemoryPersistence::default()));
/// let (mut board, mut events) = Board::new(Arc::new(MockMover::new()), session);
///
/// board.start_drag(7)?;
/// board.enter_column(BoardColumn::Status(Status::Completed));
/// board.drop_task().await;
///
/// if let Some(event) = events.next().await {
///     println!("{:?}", event);
/// }
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use taskboard_client::error::ClientError;
use taskboard_shared::auth::authorization::{require_role, TASK_EDITORS};
use taskboard_shared::forms::FormErrors;
use taskboard_shared::models::comment::Comment;
use taskboard_shared::models::task::Status;
use taskboard_shared::session::SessionStore;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::columns::BoardColumn;
use crate::drag::{DragError, DragMachine, DragState, MoveTask};
use crate::mover::TaskMover;

/// Outcome of a board action
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// Status mutation succeeded
    Moved { task_id: i64, status: Status },

    /// Status mutation failed; the card stays where the server has it
    MoveFailed {
        task_id: i64,
        status: Status,
        message: String,
    },

    /// Task deleted
    Deleted { task_id: i64 },

    /// Comment added
    Commented { task_id: i64, comment_id: i64 },

    /// Delete or comment failed
    ActionFailed { task_id: i64, message: String },
}

/// Stream of board events
pub type BoardEvents = UnboundedReceiverStream<BoardEvent>;

/// Board errors
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Drag(#[from] DragError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Interactive board for one project
pub struct Board {
    mover: Arc<dyn TaskMover>,
    session: SessionStore,
    drag: DragMachine,
    events: mpsc::UnboundedSender<BoardEvent>,
}

impl Board {
    /// Creates a board and the stream its events are reported on
    pub fn new(mover: Arc<dyn TaskMover>, session: SessionStore) -> (Self, BoardEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let board = Board {
            mover,
            session,
            drag: DragMachine::new(),
            events,
        };
        (board, UnboundedReceiverStream::new(rx))
    }

    pub fn drag_state(&self) -> DragState {
        self.drag.state()
    }

    /// Picks up a card, if the session role may move tasks
    pub fn start_drag(&mut self, task_id: i64) -> Result<(), DragError> {
        let role = self.session.snapshot().role();
        self.drag.start(task_id, role).map_err(|e| {
            tracing::debug!(task_id, error = %e, "Drag refused");
            e
        })
    }

    pub fn enter_column(&mut self, column: BoardColumn) {
        self.drag.enter_column(column);
    }

    pub fn leave_column(&mut self) {
        self.drag.leave_column();
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    /// Releases the card and sends the resulting status change
    ///
    /// Returns the move that was issued, if the card was over a column.
    pub async fn drop_task(&mut self) -> Option<MoveTask> {
        let request = self.drag.drop_task()?;

        match self.mover.move_task(request.task_id, request.status).await {
            Ok(_) => {
                tracing::info!(task_id = request.task_id, status = %request.status, "Task moved");
                self.emit(BoardEvent::Moved {
                    task_id: request.task_id,
                    status: request.status,
                });
            }
            Err(e) => {
                tracing::warn!(
                    task_id = request.task_id,
                    status = %request.status,
                    error = %e,
                    "Task move failed"
                );
                self.emit(BoardEvent::MoveFailed {
                    task_id: request.task_id,
                    status: request.status,
                    message: e.user_message("update task status"),
                });
            }
        }

        Some(request)
    }

    /// Deletes a task from its card
    ///
    /// # Errors
    ///
    /// Returns `BoardError::Client` with `ClientError::Denied` for viewers
    /// (nothing is sent), or the backend error.
    pub async fn delete_task(&self, task_id: i64) -> Result<(), BoardError> {
        require_role(&self.session.snapshot(), TASK_EDITORS).map_err(ClientError::from)?;

        match self.mover.delete_task(task_id).await {
            Ok(()) => {
                self.emit(BoardEvent::Deleted { task_id });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(task_id, error = %e, "Task delete failed");
                self.emit(BoardEvent::ActionFailed {
                    task_id,
                    message: e.user_message("delete task"),
                });
                Err(e.into())
            }
        }
    }

    /// Adds a comment from a card
    ///
    /// Blank comments are rejected before anything is sent.
    pub async fn add_comment(&self, task_id: i64, text: &str) -> Result<Comment, BoardError> {
        let text = text.trim();
        if text.is_empty() {
            let mut errors = FormErrors::new();
            errors.insert("comment", "Comment can not be empty");
            return Err(ClientError::from(errors).into());
        }

        match self.mover.add_comment(task_id, text).await {
            Ok(comment) => {
                self.emit(BoardEvent::Commented {
                    task_id,
                    comment_id: comment.id,
                });
                Ok(comment)
            }
            Err(e) => {
                tracing::warn!(task_id, error = %e, "Comment failed");
                self.emit(BoardEvent::ActionFailed {
                    task_id,
                    message: e.user_message("add comment"),
                });
                Err(e.into())
            }
        }
    }

    fn emit(&self, event: BoardEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Board event stream closed");
        }
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("drag", &self.drag.state())
            .finish_non_exhaustive()
    }
}
