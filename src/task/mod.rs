//! Task module - task types and the drag-and-drop ordering engine.
//!
//! - `types`: the closed column set, tasks, rank changes and partial patches
//! - `ordering`: pure move planning over a board's task list (no I/O)

pub mod ordering;
pub mod types;

pub use ordering::{
    columns, locate, next_rank, plan_move, DragLocation, MoveDescriptor, MoveOutcome,
    OrderingError,
};
pub use types::{Rank, Status, Task, TaskChange, TaskId, TaskPatch, UnknownStatus};
