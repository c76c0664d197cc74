//! # Taskboard Board Library
//!
//! Kanban board behavior: grouping tasks into status columns, the drag-state
//! machine for moving cards, and the orchestrator that turns drops into
//! status mutations.
//!
//! ## Modules
//!
//! - `columns`: Status columns and the Unsorted fallback
//! - `drag`: Drag-state machine
//! - `mover`: Backend seam for card actions (API-backed and mock)
//! - `board`: Orchestrator and event stream
//!
//! ## Example
//!
//! ```
//! use taskboard_board::columns::group_by_status;
//!
//! let columns = group_by_status(&[]);
//! assert_eq!(columns.len(), 4);
//! ```

pub mod board;
pub mod columns;
pub mod drag;
pub mod mover;
