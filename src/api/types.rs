//! Request and response bodies for the HTTP API.
//!
//! Column labels arrive as plain strings and are parsed here, so an unknown
//! label is answered with 400 rather than a deserialization rejection.

use serde::{Deserialize, Serialize};

use crate::board::UserId;
use crate::error::{BoardError, BoardResult};
use crate::service::NewTask;
use crate::task::{MoveOutcome, Rank, Status, Task, TaskChange, TaskId, TaskPatch};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub dev_mode: bool,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    /// Expiry, unix seconds.
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
pub struct BoardNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rank: Option<Rank>,
}

impl CreateTaskRequest {
    pub fn into_new_task(self) -> BoardResult<NewTask> {
        let status = match self.status {
            Some(label) => label.parse::<Status>()?,
            None => Status::default(),
        };
        Ok(NewTask {
            title: self.title,
            status,
            rank: self.rank,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub status: Option<String>,
    pub rank: Option<Rank>,
}

impl TryFrom<UpdateTaskRequest> for TaskPatch {
    type Error = BoardError;

    fn try_from(req: UpdateTaskRequest) -> BoardResult<Self> {
        Ok(TaskPatch {
            title: req.title,
            status: req.status.map(|s| s.parse::<Status>()).transpose()?,
            rank: req.rank,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangeRequest {
    pub id: TaskId,
    pub status: String,
    pub rank: Rank,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub changes: Vec<ChangeRequest>,
}

impl OrderRequest {
    pub fn into_changes(self) -> BoardResult<Vec<TaskChange>> {
        self.changes
            .into_iter()
            .map(|c| -> BoardResult<TaskChange> {
                Ok(TaskChange {
                    id: c.id,
                    status: c.status.parse::<Status>()?,
                    rank: c.rank,
                })
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MoveResponse {
    pub tasks: Vec<Task>,
    pub changed: Vec<TaskChange>,
}

impl From<MoveOutcome> for MoveResponse {
    fn from(outcome: MoveOutcome) -> Self {
        Self {
            tasks: outcome.tasks,
            changed: outcome.changed,
        }
    }
}
