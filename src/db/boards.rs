use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::{time_column, uuid_column, Database};
use crate::board::{Board, BoardId, UserId};
use crate::error::{BoardError, BoardResult};

const BOARD_SELECT: &str = "SELECT b.id, b.name, b.owner_id, u.username, b.created_at
     FROM boards b JOIN users u ON b.owner_id = u.id";

fn parse_board_row(row: &Row) -> rusqlite::Result<Board> {
    Ok(Board {
        id: uuid_column(row.get(0)?, 0)?,
        name: row.get(1)?,
        owner_id: uuid_column(row.get(2)?, 2)?,
        owner_username: row.get(3)?,
        created_at: time_column(row.get(4)?, 4)?,
    })
}

impl Database {
    pub fn create_board(&self, name: &str, owner: UserId) -> BoardResult<Board> {
        let id = Uuid::new_v4();
        {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO boards (id, name, owner_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), name, owner.to_string(), Utc::now().to_rfc3339()],
            )?;
        }
        self.get_board(id)?
            .ok_or_else(|| BoardError::not_found("board", id))
    }

    pub fn get_board(&self, id: BoardId) -> BoardResult<Option<Board>> {
        let conn = self.conn()?;
        let board = conn
            .query_row(
                &format!("{} WHERE b.id = ?1", BOARD_SELECT),
                params![id.to_string()],
                parse_board_row,
            )
            .optional()?;
        Ok(board)
    }

    /// Boards owned by `user` or shared with them, oldest first.
    pub fn boards_for_user(&self, user: UserId) -> BoardResult<Vec<Board>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE b.owner_id = ?1
                OR b.id IN (SELECT board_id FROM board_shares WHERE user_id = ?1)
             ORDER BY b.created_at, b.id",
            BOARD_SELECT
        ))?;
        let rows = stmt.query_map(params![user.to_string()], parse_board_row)?;
        let boards = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(boards)
    }

    /// Returns the renamed board, or `None` if it does not exist.
    pub fn rename_board(&self, id: BoardId, name: &str) -> BoardResult<Option<Board>> {
        let updated = {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE boards SET name = ?1 WHERE id = ?2",
                params![name, id.to_string()],
            )?
        };
        if updated == 0 {
            return Ok(None);
        }
        self.get_board(id)
    }

    /// Delete a board together with its tasks and share grants.
    pub fn delete_board(&self, id: BoardId) -> BoardResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM boards WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    pub fn is_shared_with(&self, board: BoardId, user: UserId) -> BoardResult<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM board_shares WHERE board_id = ?1 AND user_id = ?2",
                params![board.to_string(), user.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn list_shares(&self, board: BoardId) -> BoardResult<Vec<UserId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.user_id FROM board_shares s JOIN users u ON s.user_id = u.id
             WHERE s.board_id = ?1 ORDER BY u.username",
        )?;
        let rows = stmt.query_map(params![board.to_string()], |row| {
            uuid_column(row.get(0)?, 0)
        })?;
        let users = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Grant access. Returns false when the grant already existed.
    pub fn insert_share(&self, board: BoardId, user: UserId) -> BoardResult<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO board_shares (board_id, user_id) VALUES (?1, ?2)",
            params![board.to_string(), user.to_string()],
        )?;
        Ok(inserted > 0)
    }

    /// Revoke access. Returns false when there was no such grant.
    pub fn delete_share(&self, board: BoardId, user: UserId) -> BoardResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM board_shares WHERE board_id = ?1 AND user_id = ?2",
            params![board.to_string(), user.to_string()],
        )?;
        Ok(deleted > 0)
    }
}
