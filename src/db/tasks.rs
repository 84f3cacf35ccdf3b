use rusqlite::{params, OptionalExtension, Row};

use super::{status_column, uuid_column, Database};
use crate::board::BoardId;
use crate::error::{BoardError, BoardResult};
use crate::task::{Task, TaskChange, TaskId, TaskPatch};

const TASK_COLUMNS: &str = "id, board_id, title, status, sort_order";

fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: uuid_column(row.get(0)?, 0)?,
        board_id: uuid_column(row.get(1)?, 1)?,
        title: row.get(2)?,
        status: status_column(row.get(3)?, 3)?,
        rank: row.get(4)?,
    })
}

impl Database {
    /// All tasks on a board, rank ascending (id breaks ties).
    pub fn list_tasks(&self, board: BoardId) -> BoardResult<Vec<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE board_id = ?1 ORDER BY sort_order, id",
            TASK_COLUMNS
        ))?;
        let rows = stmt.query_map(params![board.to_string()], parse_task_row)?;
        let tasks = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    pub fn get_task(&self, id: TaskId) -> BoardResult<Option<Task>> {
        let conn = self.conn()?;
        let task = conn
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                params![id.to_string()],
                parse_task_row,
            )
            .optional()?;
        Ok(task)
    }

    pub fn insert_task(&self, task: &Task) -> BoardResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tasks (id, board_id, title, status, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                task.id.to_string(),
                task.board_id.to_string(),
                task.title,
                task.status.as_str(),
                task.rank
            ],
        )?;
        Ok(())
    }

    /// Apply a partial update. Returns the stored task, or `None` if missing.
    pub fn update_task(&self, id: TaskId, patch: &TaskPatch) -> BoardResult<Option<Task>> {
        let updated = {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE tasks SET
                    title = COALESCE(?1, title),
                    status = COALESCE(?2, status),
                    sort_order = COALESCE(?3, sort_order)
                 WHERE id = ?4",
                params![
                    patch.title,
                    patch.status.map(|s| s.as_str()),
                    patch.rank,
                    id.to_string()
                ],
            )?
        };
        if updated == 0 {
            return Ok(None);
        }
        self.get_task(id)
    }

    pub fn delete_task(&self, id: TaskId) -> BoardResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    /// Write a whole ordering change set in one transaction.
    ///
    /// Every change must name a task on `board`; otherwise nothing is written
    /// and `NotFound` is returned.
    pub fn apply_ordering(&self, board: BoardId, changes: &[TaskChange]) -> BoardResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE tasks SET status = ?1, sort_order = ?2 WHERE id = ?3 AND board_id = ?4",
            )?;
            for change in changes {
                let updated = stmt.execute(params![
                    change.status.as_str(),
                    change.rank,
                    change.id.to_string(),
                    board.to_string()
                ])?;
                if updated == 0 {
                    return Err(BoardError::not_found("task", change.id));
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}
