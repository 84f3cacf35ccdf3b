//! Error taxonomy for board, share and task operations.

use axum::http::StatusCode;
use thiserror::Error;

use crate::task::{OrderingError, TaskId, UnknownStatus};

pub type BoardResult<T> = Result<T, BoardError>;

#[derive(Debug, Error)]
pub enum BoardError {
    /// Board, task, share or user does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// Caller lacks the required relationship to the board.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid column: {0}")]
    InvalidColumn(String),

    /// Move references a task absent from the board.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Move was computed against an outdated view of the board.
    #[error("stale move: {0}")]
    StaleMove(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("username already taken: {0}")]
    UsernameTaken(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    /// Storage call failed.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl BoardError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } | Self::TaskNotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::InvalidColumn(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::StaleMove(_) | Self::UsernameTaken(_) => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OrderingError> for BoardError {
    fn from(err: OrderingError) -> Self {
        match err {
            OrderingError::TaskNotFound(id) => Self::TaskNotFound(id),
            OrderingError::InvalidColumn(label) => Self::InvalidColumn(label),
            stale @ OrderingError::StaleMove { .. } => Self::StaleMove(stale.to_string()),
        }
    }
}

impl From<UnknownStatus> for BoardError {
    fn from(err: UnknownStatus) -> Self {
        Self::InvalidColumn(err.0)
    }
}

impl From<rusqlite::Error> for BoardError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Handlers answer with `(StatusCode, String)` like the rest of the API.
impl From<BoardError> for (StatusCode, String) {
    fn from(err: BoardError) -> Self {
        let status = err.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "request failed");
        }
        (status, err.to_string())
    }
}
