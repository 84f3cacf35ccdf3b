//! SQLite persistence for users, boards, share grants and tasks.
//!
//! A single connection guarded by a mutex. Every method takes the lock for
//! the duration of one statement (or one transaction) and never across an
//! `.await`.

mod boards;
mod tasks;
mod users;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;
use uuid::Uuid;

use crate::error::{BoardError, BoardResult};
use crate::task::Status;

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS boards (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    owner_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS board_shares (
    board_id TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
    user_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (board_id, user_id)
);

CREATE TABLE IF NOT EXISTS tasks (
    id         TEXT PRIMARY KEY,
    board_id   TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
    title      TEXT NOT NULL,
    status     TEXT NOT NULL CHECK (status IN ('To-Do', 'In Progress', 'Complete')),
    sort_order INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_board ON tasks(board_id, status, sort_order);
CREATE INDEX IF NOT EXISTS idx_board_shares_user ON board_shares(user_id);
"#;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: &Path) -> BoardResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                BoardError::Persistence(format!("create {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path)?;
        tracing::info!("Opened database at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> BoardResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> BoardResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> BoardResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BoardError::Persistence("database lock poisoned".to_string()))
    }
}

fn uuid_column(value: String, idx: usize) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn status_column(value: String, idx: usize) -> rusqlite::Result<Status> {
    value
        .parse::<Status>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn time_column(value: String, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_on_disk_is_reopenable() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("boards.db");

        {
            let db = Database::open(&path).unwrap();
            test_support::user(&db, "alice");
        }

        let db = Database::open(&path).unwrap();
        assert!(db.find_user_by_username("alice").unwrap().is_some());
    }
}
