//! Task and column types shared by the ordering engine, storage and API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::BoardId;

/// Opaque, server-assigned task identifier.
pub type TaskId = Uuid;

/// Position of a task within its (board, status) bucket.
pub type Rank = i64;

/// The fixed set of board columns.
///
/// This is the single source of truth for valid status values: the ordering
/// engine, the database layer and the HTTP boundary all parse through
/// [`Status::from_str`] and reject anything else.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Complete,
}

impl Status {
    /// All columns in display order.
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Complete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "To-Do",
            Self::InProgress => "In Progress",
            Self::Complete => "Complete",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status label is not one of the known columns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown column: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl TryFrom<String> for Status {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

/// A card on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub board_id: BoardId,
    pub title: String,
    pub status: Status,
    pub rank: Rank,
}

impl Task {
    pub fn new(board_id: BoardId, title: impl Into<String>, status: Status, rank: Rank) -> Self {
        Self {
            id: Uuid::new_v4(),
            board_id,
            title: title.into(),
            status,
            rank,
        }
    }

    /// Sort key inside a bucket: rank, then id as the deterministic tiebreak.
    pub fn order_key(&self) -> (Rank, TaskId) {
        (self.rank, self.id)
    }
}

/// A single (status, rank) assignment produced by the ordering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChange {
    pub id: TaskId,
    pub status: Status,
    pub rank: Rank,
}

impl TaskChange {
    pub fn of(task: &Task) -> Self {
        Self {
            id: task.id,
            status: task.status,
            rank: task.rank,
        }
    }
}

/// Partial task update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub status: Option<Status>,
    pub rank: Option<Rank>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.status.is_none() && self.rank.is_none()
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(rank) = self.rank {
            task.rank = rank;
        }
    }
}

impl From<TaskChange> for TaskPatch {
    fn from(change: TaskChange) -> Self {
        Self {
            title: None,
            status: Some(change.status),
            rank: Some(change.rank),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_round_trip() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
    }

    #[test]
    fn test_new_tasks_default_to_todo() {
        assert_eq!(Status::default(), Status::Todo);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = "Archived".parse::<Status>().unwrap_err();
        assert_eq!(err, UnknownStatus("Archived".to_string()));
        // Labels are case sensitive.
        assert!("to-do".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_serializes_as_label() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");

        let parsed: Result<Status, _> = serde_json::from_str("\"Archived\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_patch_preserves_omitted_fields() {
        let mut task = Task::new(Uuid::new_v4(), "Write docs", Status::Todo, 3);
        let patch = TaskPatch {
            rank: Some(0),
            ..Default::default()
        };
        patch.apply_to(&mut task);

        assert_eq!(task.title, "Write docs");
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.rank, 0);
    }
}
