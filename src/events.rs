//! Real-time board notifications.
//!
//! One broadcast channel per board, created on first subscription. Publishing
//! is best effort: with no subscribers the event is dropped, and a failed
//! publish never fails the write that caused it. Clients that miss events
//! recover by refetching the task list.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

use crate::board::{Board, BoardId};
use crate::task::{Task, TaskChange, TaskId};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardEvent {
    TaskAdded { task: Task },
    TaskUpdated { task: Task },
    TasksReordered { changes: Vec<TaskChange> },
    TaskDeleted { task_id: TaskId },
    BoardRenamed { board: Board },
    BoardDeleted { board_id: BoardId },
}

impl BoardEvent {
    /// SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaskAdded { .. } => "task_added",
            Self::TaskUpdated { .. } => "task_updated",
            Self::TasksReordered { .. } => "tasks_reordered",
            Self::TaskDeleted { .. } => "task_deleted",
            Self::BoardRenamed { .. } => "board_renamed",
            Self::BoardDeleted { .. } => "board_deleted",
        }
    }
}

pub struct EventHub {
    channels: RwLock<HashMap<BoardId, broadcast::Sender<BoardEvent>>>,
    capacity: usize,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn subscribe(&self, board: BoardId) -> broadcast::Receiver<BoardEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(board)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Send `event` to current subscribers of `board`. Returns how many
    /// subscribers received it.
    pub async fn publish(&self, board: BoardId, event: BoardEvent) -> usize {
        let kind = event.kind();
        let sent = {
            let channels = self.channels.read().await;
            match channels.get(&board) {
                Some(tx) => tx.send(event).ok(),
                None => return 0,
            }
        };

        match sent {
            Some(receivers) => {
                tracing::debug!(board = %board, kind, receivers, "published board event");
                receivers
            }
            None => {
                // Every subscriber has gone away.
                let mut channels = self.channels.write().await;
                if channels
                    .get(&board)
                    .is_some_and(|tx| tx.receiver_count() == 0)
                {
                    channels.remove(&board);
                }
                0
            }
        }
    }

    /// Drop the board's channel; subscribers see the stream end.
    pub async fn close(&self, board: BoardId) {
        self.channels.write().await.remove(&board);
    }

    pub async fn subscriber_count(&self, board: BoardId) -> usize {
        self.channels
            .read()
            .await
            .get(&board)
            .map_or(0, |tx| tx.receiver_count())
    }
}
