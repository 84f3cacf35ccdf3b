use rusqlite::{params, OptionalExtension, Row};

use super::{is_unique_violation, time_column, uuid_column, Database};
use crate::board::{User, UserId, UserSummary};
use crate::error::{BoardError, BoardResult};

fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_column(row.get(0)?, 0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: time_column(row.get(3)?, 3)?,
    })
}

impl Database {
    /// Insert a new user. Fails with `UsernameTaken` on a duplicate name.
    pub fn insert_user(&self, user: &User) -> BoardResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.to_string(),
                user.username,
                user.password_hash,
                user.created_at.to_rfc3339()
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                BoardError::UsernameTaken(user.username.clone())
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    pub fn find_user_by_username(&self, username: &str) -> BoardResult<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
                params![username],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> BoardResult<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, password_hash, created_at FROM users WHERE id = ?1",
                params![id.to_string()],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Everyone but `id`, sorted by username. Used to pick share targets.
    pub fn list_users_except(&self, id: UserId) -> BoardResult<Vec<UserSummary>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, username FROM users WHERE id != ?1 ORDER BY username")?;
        let rows = stmt.query_map(params![id.to_string()], |row| {
            Ok(UserSummary {
                id: uuid_column(row.get(0)?, 0)?,
                username: row.get(1)?,
            })
        })?;
        let users = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }
}
