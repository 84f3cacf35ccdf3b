//! Server-sent event stream of board mutations.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use tokio::sync::broadcast::error::RecvError;

use super::auth::AuthUser;
use super::routes::AppState;
use crate::board::BoardId;
use crate::events::BoardEvent;

/// GET /api/boards/:id/events - Stream board events until the board is
/// deleted or the client disconnects.
///
/// A subscriber that falls behind gets a `lagged` event carrying the number
/// of missed events and should refetch the task list.
pub async fn board_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(board_id): Path<BoardId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    state.service.get_board(user.id, board_id).await?;
    let mut rx = state.service.events().subscribe(board_id).await;
    tracing::debug!(board = %board_id, user = %user.id, "event stream opened");

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let last = matches!(event, BoardEvent::BoardDeleted { .. });
                    match Event::default().event(event.kind()).json_data(&event) {
                        Ok(sse) => yield Ok(sse),
                        Err(e) => tracing::warn!(error = %e, "failed to encode board event"),
                    }
                    if last {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(board = %board_id, missed, "event subscriber lagged");
                    yield Ok(Event::default().event("lagged").data(missed.to_string()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
