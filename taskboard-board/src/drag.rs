/// Drag-state machine for board cards
///
/// # States
///
/// ```text
///            start (role may drag)
///   Idle ─────────────────────────> Dragging(task)
///    ^                               │        ^
///    │ drop: MoveTask                │ enter  │ leave
///    │                               v        │
///    └──────────────────────── OverColumn(task, status)
///
///   any state ── cancel ──> Idle
///   Dragging ── drop ──> Idle (no move)
/// ```
///
/// The machine is pure: it never talks to the backend. A drop over a column
/// yields exactly one [`MoveTask`] for the caller to send.

use taskboard_shared::models::task::Status;
use taskboard_shared::models::user::Role;

use crate::columns::BoardColumn;

/// Current drag state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        task_id: i64,
    },
    OverColumn {
        task_id: i64,
        status: Status,
    },
}

impl DragState {
    /// Task being dragged, if any
    pub fn task_id(&self) -> Option<i64> {
        match self {
            DragState::Idle => None,
            DragState::Dragging { task_id } | DragState::OverColumn { task_id, .. } => {
                Some(*task_id)
            }
        }
    }
}

/// Status change requested by a drop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveTask {
    pub task_id: i64,
    pub status: Status,
}

/// Drag errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DragError {
    /// The session role may not move cards (Viewer, or nobody signed in)
    #[error("Role {} may not move tasks", role_name(.role))]
    NotAllowed { role: Option<Role> },

    /// Another card is already being dragged
    #[error("Task {task_id} is already being dragged")]
    AlreadyDragging { task_id: i64 },
}

fn role_name(role: &Option<Role>) -> &'static str {
    role.map(|role| role.as_str()).unwrap_or("(none)")
}

/// Whether a role may drag cards
pub fn can_drag(role: Option<Role>) -> bool {
    role.is_some_and(|role| role.can_drag())
}

/// Drag-state machine
#[derive(Debug, Default)]
pub struct DragMachine {
    state: DragState,
}

impl DragMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Starts dragging a card
    ///
    /// # Errors
    ///
    /// - `DragError::NotAllowed` if the role may not drag
    /// - `DragError::AlreadyDragging` if a drag is in progress
    pub fn start(&mut self, task_id: i64, role: Option<Role>) -> Result<(), DragError> {
        if !can_drag(role) {
            return Err(DragError::NotAllowed { role });
        }
        if let Some(current) = self.state.task_id() {
            return Err(DragError::AlreadyDragging { task_id: current });
        }
        self.state = DragState::Dragging { task_id };
        Ok(())
    }

    /// Pointer entered a column
    ///
    /// Ignored when idle or when the column is not a drop target.
    pub fn enter_column(&mut self, column: BoardColumn) {
        let Some(task_id) = self.state.task_id() else {
            return;
        };
        self.state = match column.drop_status() {
            Some(status) => DragState::OverColumn { task_id, status },
            None => DragState::Dragging { task_id },
        };
    }

    /// Pointer left the current column
    pub fn leave_column(&mut self) {
        if let DragState::OverColumn { task_id, .. } = self.state {
            self.state = DragState::Dragging { task_id };
        }
    }

    /// Releases the card
    ///
    /// Returns the move to perform when released over a column. Always
    /// returns to `Idle`.
    pub fn drop_task(&mut self) -> Option<MoveTask> {
        let state = std::mem::take(&mut self.state);
        match state {
            DragState::OverColumn { task_id, status } => Some(MoveTask { task_id, status }),
            DragState::Dragging { .. } | DragState::Idle => None,
        }
    }

    /// Abandons the drag
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_drag() {
        assert!(can_drag(Some(Role::Admin)));
        assert!(can_drag(Some(Role::ProjectManager)));
        assert!(can_drag(Some(Role::Developer)));
        assert!(!can_drag(Some(Role::Viewer)));
        assert!(!can_drag(None));
    }

    #[test]
    fn test_viewer_cannot_start() {
        let mut machine = DragMachine::new();
        assert_eq!(
            machine.start(1, Some(Role::Viewer)),
            Err(DragError::NotAllowed {
                role: Some(Role::Viewer)
            })
        );
        assert_eq!(machine.start(1, None), Err(DragError::NotAllowed { role: None }));
        assert_eq!(machine.state(), DragState::Idle);
    }

    #[test]
    fn test_drop_over_column_emits_one_move() {
        let mut machine = DragMachine::new();
        machine.start(7, Some(Role::Developer)).unwrap();
        machine.enter_column(BoardColumn::Status(Status::InProgress));
        machine.enter_column(BoardColumn::Status(Status::Completed));
        assert_eq!(
            machine.state(),
            DragState::OverColumn {
                task_id: 7,
                status: Status::Completed
            }
        );

        assert_eq!(
            machine.drop_task(),
            Some(MoveTask {
                task_id: 7,
                status: Status::Completed
            })
        );
        assert_eq!(machine.state(), DragState::Idle);
        assert_eq!(machine.drop_task(), None);
    }

    #[test]
    fn test_drop_outside_columns_emits_nothing() {
        let mut machine = DragMachine::new();
        machine.start(7, Some(Role::Admin)).unwrap();
        machine.enter_column(BoardColumn::Status(Status::ToDo));
        machine.leave_column();
        assert_eq!(machine.state(), DragState::Dragging { task_id: 7 });

        assert_eq!(machine.drop_task(), None);
        assert_eq!(machine.state(), DragState::Idle);
    }

    #[test]
    fn test_unsorted_column_is_not_a_target() {
        let mut machine = DragMachine::new();
        machine.start(3, Some(Role::Admin)).unwrap();
        machine.enter_column(BoardColumn::Status(Status::ToDo));
        machine.enter_column(BoardColumn::Unsorted);
        assert_eq!(machine.state(), DragState::Dragging { task_id: 3 });
        assert_eq!(machine.drop_task(), None);
    }

    #[test]
    fn test_cancel_from_any_state() {
        let mut machine = DragMachine::new();
        machine.cancel();
        assert_eq!(machine.state(), DragState::Idle);

        machine.start(1, Some(Role::Admin)).unwrap();
        machine.cancel();
        assert_eq!(machine.state(), DragState::Idle);

        machine.start(1, Some(Role::Admin)).unwrap();
        machine.enter_column(BoardColumn::Status(Status::Completed));
        machine.cancel();
        assert_eq!(machine.state(), DragState::Idle);
        assert_eq!(machine.drop_task(), None);
    }

    #[test]
    fn test_second_drag_rejected() {
        let mut machine = DragMachine::new();
        machine.start(1, Some(Role::Admin)).unwrap();
        assert_eq!(
            machine.start(2, Some(Role::Admin)),
            Err(DragError::AlreadyDragging { task_id: 1 })
        );
    }

    #[test]
    fn test_enter_column_while_idle_is_ignored() {
        let mut machine = DragMachine::new();
        machine.enter_column(BoardColumn::Status(Status::Completed));
        assert_eq!(machine.state(), DragState::Idle);
    }
}
