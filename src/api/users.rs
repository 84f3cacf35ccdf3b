use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};

use super::auth::AuthUser;
use super::routes::AppState;
use crate::board::UserSummary;

/// GET /api/users - Everyone except the caller, for picking share targets.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<UserSummary>>, (StatusCode, String)> {
    let users = state.service.list_users(user.id).await?;
    Ok(Json(users))
}
