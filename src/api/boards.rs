//! Board and share endpoints.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use super::auth::AuthUser;
use super::routes::AppState;
use super::types::{BoardNameRequest, ShareRequest};
use super::{events, tasks};
use crate::board::{Board, BoardId, ShareGrant, UserId};

/// Routes nested under `/api/boards`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_boards))
        .route("/", post(create_board))
        .route("/:id", put(rename_board))
        .route("/:id", delete(delete_board))
        .route("/:id/shares", get(list_shares))
        .route("/:id/shares", post(create_share))
        .route("/:id/shares/:user_id", delete(delete_share))
        .route("/:id/tasks", get(tasks::list_tasks))
        .route("/:id/tasks", post(tasks::create_task))
        .route("/:id/tasks/move", post(tasks::move_task))
        .route("/:id/tasks/order", put(tasks::apply_ordering))
        .route("/:id/events", get(events::board_events))
}

/// GET /api/boards - Boards the caller owns or has been granted.
async fn list_boards(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Board>>, (StatusCode, String)> {
    let boards = state.service.list_boards(user.id).await?;
    Ok(Json(boards))
}

/// POST /api/boards - Create a board owned by the caller.
async fn create_board(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<BoardNameRequest>,
) -> Result<(StatusCode, Json<Board>), (StatusCode, String)> {
    let board = state.service.create_board(user.id, &req.name).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

/// PUT /api/boards/:id - Rename a board (owner only).
async fn rename_board(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<BoardId>,
    Json(req): Json<BoardNameRequest>,
) -> Result<Json<Board>, (StatusCode, String)> {
    let board = state.service.rename_board(user.id, id, &req.name).await?;
    Ok(Json(board))
}

/// DELETE /api/boards/:id - Delete a board with its tasks (owner only).
async fn delete_board(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<BoardId>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.service.delete_board(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/boards/:id/shares - Users the board is shared with.
async fn list_shares(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<BoardId>,
) -> Result<Json<Vec<UserId>>, (StatusCode, String)> {
    let users = state.service.list_shares(user.id, id).await?;
    Ok(Json(users))
}

/// POST /api/boards/:id/shares - Share a board (owner only).
///
/// 201 for a new grant, 200 if it already existed.
async fn create_share(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<BoardId>,
    Json(req): Json<ShareRequest>,
) -> Result<(StatusCode, Json<ShareGrant>), (StatusCode, String)> {
    let created = state.service.create_share(user.id, id, req.user_id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(ShareGrant {
            board_id: id,
            user_id: req.user_id,
        }),
    ))
}

/// DELETE /api/boards/:id/shares/:user_id - Revoke a share (owner only).
async fn delete_share(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, target)): Path<(BoardId, UserId)>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.service.delete_share(user.id, id, target).await?;
    Ok(StatusCode::NO_CONTENT)
}
