//! Authorization gate for board and task operations.
//!
//! Every check takes the acting user explicitly; there is no ambient
//! "current user".
//!
//! - Owners may do anything with their board.
//! - Share grantees may read the board and create/update/delete its tasks.
//! - Rename, delete and share management are owner-only.

use crate::board::{Board, BoardId, UserId};
use crate::db::Database;
use crate::error::{BoardError, BoardResult};
use crate::task::{Task, TaskId};

/// The caller's relationship to a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    Grantee,
}

/// What the caller is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Read the board and work with its tasks.
    Collaborate,
    /// Rename, delete or manage shares.
    Manage,
}

/// Resolve `caller`'s access to `board_id` and check it covers `needed`.
///
/// A missing board is `NotFound`; an existing board the caller may not touch
/// is `Unauthorized`.
pub fn authorize(
    db: &Database,
    caller: UserId,
    board_id: BoardId,
    needed: Permission,
) -> BoardResult<(Board, Access)> {
    let board = db
        .get_board(board_id)?
        .ok_or_else(|| BoardError::not_found("board", board_id))?;

    let access = if board.is_owned_by(caller) {
        Access::Owner
    } else if db.is_shared_with(board_id, caller)? {
        Access::Grantee
    } else {
        tracing::debug!(%caller, board = %board_id, "no access to board");
        return Err(BoardError::unauthorized("no access to this board"));
    };

    if needed == Permission::Manage && access != Access::Owner {
        return Err(BoardError::unauthorized(
            "only the board owner may perform this action",
        ));
    }

    Ok((board, access))
}

/// Load a task and check the caller may work on its board.
pub fn authorize_task(db: &Database, caller: UserId, task_id: TaskId) -> BoardResult<Task> {
    let task = db
        .get_task(task_id)?
        .ok_or_else(|| BoardError::not_found("task", task_id))?;
    authorize(db, caller, task.board_id, Permission::Collaborate)?;
    Ok(task)
}
