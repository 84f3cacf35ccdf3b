//! Task endpoints.
//!
//! Board-scoped handlers are mounted by [`super::boards::routes`]; the
//! task-id routes live under `/api/tasks`.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, put},
    Json, Router,
};

use super::auth::AuthUser;
use super::routes::AppState;
use super::types::{CreateTaskRequest, MoveResponse, OrderRequest, UpdateTaskRequest};
use crate::board::BoardId;
use crate::task::{MoveDescriptor, Task, TaskId, TaskPatch};

/// Routes nested under `/api/tasks`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:id", put(update_task))
        .route("/:id", delete(delete_task))
}

/// GET /api/boards/:id/tasks - All tasks on a board, rank ascending.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(board_id): Path<BoardId>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    let tasks = state.service.list_tasks(user.id, board_id).await?;
    Ok(Json(tasks))
}

/// POST /api/boards/:id/tasks - Create a task (appended to its column
/// unless a rank is given).
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(board_id): Path<BoardId>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, String)> {
    let new = req.into_new_task()?;
    let task = state.service.create_task(user.id, board_id, new).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// POST /api/boards/:id/tasks/move - Apply a drag-and-drop move.
pub async fn move_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(board_id): Path<BoardId>,
    Json(mv): Json<MoveDescriptor>,
) -> Result<Json<MoveResponse>, (StatusCode, String)> {
    let outcome = state.service.move_task(user.id, board_id, &mv).await?;
    Ok(Json(outcome.into()))
}

/// PUT /api/boards/:id/tasks/order - Persist a client-computed change set.
pub async fn apply_ordering(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(board_id): Path<BoardId>,
    Json(req): Json<OrderRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let changes = req.into_changes()?;
    state
        .service
        .apply_ordering(user.id, board_id, &changes)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/tasks/:id - Partial update.
async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TaskId>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, (StatusCode, String)> {
    let patch = TaskPatch::try_from(req)?;
    let task = state.service.update_task(user.id, id, patch).await?;
    Ok(Json(task))
}

/// DELETE /api/tasks/:id
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.service.delete_task(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
