/// Board columns
///
/// The board shows one column per known status, in workflow order. Tasks
/// whose status is missing or not one of the known values land in a
/// trailing "Unsorted" column instead of disappearing. Column membership is
/// derived from the server status only.

use std::fmt;

use taskboard_shared::models::task::{Status, Task};

/// Title of the fallback column
pub const UNSORTED_TITLE: &str = "Unsorted";

/// Column identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardColumn {
    Status(Status),
    Unsorted,
}

impl BoardColumn {
    /// Column a task belongs to
    pub fn for_task(task: &Task) -> Self {
        match task.known_status() {
            Some(status) => BoardColumn::Status(status),
            None => BoardColumn::Unsorted,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            BoardColumn::Status(status) => status.as_str(),
            BoardColumn::Unsorted => UNSORTED_TITLE,
        }
    }

    /// Status a drop on this column moves a task to
    ///
    /// The Unsorted column is not a drop target.
    pub fn drop_status(&self) -> Option<Status> {
        match self {
            BoardColumn::Status(status) => Some(*status),
            BoardColumn::Unsorted => None,
        }
    }
}

impl fmt::Display for BoardColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// One rendered column with its tasks
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub column: BoardColumn,
    pub tasks: Vec<Task>,
}

impl Column {
    pub fn title(&self) -> &'static str {
        self.column.title()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Groups tasks into columns
///
/// The four status columns are always present. The Unsorted column is
/// appended only when some task needs it. Task order within a column follows
/// the input order.
pub fn group_by_status(tasks: &[Task]) -> Vec<Column> {
    let mut columns: Vec<Column> = Status::ALL
        .iter()
        .map(|status| Column {
            column: BoardColumn::Status(*status),
            tasks: Vec::new(),
        })
        .collect();
    let mut unsorted = Vec::new();

    for task in tasks {
        match BoardColumn::for_task(task) {
            BoardColumn::Status(status) => {
                if let Some(column) = columns
                    .iter_mut()
                    .find(|c| c.column == BoardColumn::Status(status))
                {
                    column.tasks.push(task.clone());
                }
            }
            BoardColumn::Unsorted => {
                tracing::debug!(task_id = task.id, status = ?task.status, "Task has no known status");
                unsorted.push(task.clone());
            }
        }
    }

    if !unsorted.is_empty() {
        columns.push(Column {
            column: BoardColumn::Unsorted,
            tasks: unsorted,
        });
    }

    columns
}
