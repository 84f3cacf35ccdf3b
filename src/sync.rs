//! Client-side board session.
//!
//! A [`BoardSession`] keeps a local copy of one board's tasks and applies
//! drag-and-drop moves optimistically: the ordering engine rewrites the local
//! list first, then the changed set is pushed to a [`TaskStore`]. Every pushed
//! task is acknowledged individually. When any acknowledgement fails the
//! session reconciles according to its [`ReconcilePolicy`]; the failure is
//! logged and reported, never raised.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::board::{BoardId, UserId};
use crate::error::BoardResult;
use crate::events::BoardEvent;
use crate::service::{append_rank, BoardService, NewTask};
use crate::task::{
    self, MoveDescriptor, OrderingError, Status, Task, TaskChange, TaskId, TaskPatch,
};

/// Persistence contract the session talks to.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self, caller: UserId, board: BoardId) -> BoardResult<Vec<Task>>;

    async fn create_task(&self, caller: UserId, board: BoardId, new: NewTask) -> BoardResult<Task>;

    async fn update_task(
        &self,
        caller: UserId,
        task_id: TaskId,
        patch: TaskPatch,
    ) -> BoardResult<Task>;

    /// Persist a change set atomically.
    async fn apply_ordering(
        &self,
        caller: UserId,
        board: BoardId,
        changes: &[TaskChange],
    ) -> BoardResult<()>;

    async fn delete_task(&self, caller: UserId, task_id: TaskId) -> BoardResult<()>;
}

#[async_trait]
impl TaskStore for BoardService {
    async fn list_tasks(&self, caller: UserId, board: BoardId) -> BoardResult<Vec<Task>> {
        BoardService::list_tasks(self, caller, board).await
    }

    async fn create_task(&self, caller: UserId, board: BoardId, new: NewTask) -> BoardResult<Task> {
        BoardService::create_task(self, caller, board, new).await
    }

    async fn update_task(
        &self,
        caller: UserId,
        task_id: TaskId,
        patch: TaskPatch,
    ) -> BoardResult<Task> {
        BoardService::update_task(self, caller, task_id, patch).await
    }

    async fn apply_ordering(
        &self,
        caller: UserId,
        board: BoardId,
        changes: &[TaskChange],
    ) -> BoardResult<()> {
        BoardService::apply_ordering(self, caller, board, changes).await
    }

    async fn delete_task(&self, caller: UserId, task_id: TaskId) -> BoardResult<()> {
        BoardService::delete_task(self, caller, task_id).await
    }
}

/// How a move's changed set is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// One atomic `apply_ordering` call.
    #[default]
    Batched,
    /// One concurrent `update_task` per changed task.
    PerTask,
}

/// What to do with local state after a failed write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// Leave the optimistic state in place.
    #[default]
    Keep,
    /// Reload the task list from the store.
    Refetch,
    /// Restore the list as it was before the move.
    Revert,
}

/// Per-task write acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAck {
    pub task_id: TaskId,
    pub result: Result<(), String>,
}

impl TaskAck {
    fn ok(task_id: TaskId) -> Self {
        Self {
            task_id,
            result: Ok(()),
        }
    }

    fn failed(task_id: TaskId, error: impl ToString) -> Self {
        Self {
            task_id,
            result: Err(error.to_string()),
        }
    }
}

/// Outcome of one optimistic move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub changed: Vec<TaskChange>,
    pub acks: Vec<TaskAck>,
    /// Policy applied after a failed acknowledgement, if any.
    pub reconciled: Option<ReconcilePolicy>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.acks.iter().all(|ack| ack.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskAck> {
        self.acks.iter().filter(|ack| ack.result.is_err())
    }
}

pub struct BoardSession<S> {
    store: Arc<S>,
    caller: UserId,
    board: BoardId,
    tasks: Vec<Task>,
    write_mode: WriteMode,
    policy: ReconcilePolicy,
}

impl<S: TaskStore> BoardSession<S> {
    /// An empty session. Call [`refresh`](Self::refresh) to populate it.
    pub fn new(store: Arc<S>, caller: UserId, board: BoardId) -> Self {
        Self {
            store,
            caller,
            board,
            tasks: Vec::new(),
            write_mode: WriteMode::default(),
            policy: ReconcilePolicy::default(),
        }
    }

    pub async fn load(store: Arc<S>, caller: UserId, board: BoardId) -> BoardResult<Self> {
        let mut session = Self::new(store, caller, board);
        session.refresh().await?;
        Ok(session)
    }

    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    pub fn with_reconcile_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn board(&self) -> BoardId {
        self.board
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Rank-sorted tasks of one column.
    pub fn column(&self, status: Status) -> Vec<Task> {
        task::columns(&self.tasks).remove(&status).unwrap_or_default()
    }

    pub async fn refresh(&mut self) -> BoardResult<()> {
        self.tasks = self.store.list_tasks(self.caller, self.board).await?;
        Ok(())
    }

    /// Apply a move locally, then push the changed set.
    ///
    /// Engine errors are returned before anything changes. Write failures are
    /// reported in the [`SyncReport`] after reconciliation.
    pub async fn move_task(&mut self, mv: &MoveDescriptor) -> Result<SyncReport, OrderingError> {
        let outcome = task::plan_move(&self.tasks, mv)?;
        if outcome.is_noop() {
            return Ok(SyncReport::default());
        }

        let snapshot = std::mem::replace(&mut self.tasks, outcome.tasks);
        let acks = self.push(&outcome.changed).await;

        let mut report = SyncReport {
            changed: outcome.changed,
            acks,
            reconciled: None,
        };
        if !report.is_clean() {
            for ack in report.failures() {
                if let Err(error) = &ack.result {
                    tracing::warn!(
                        task = %ack.task_id,
                        board = %self.board,
                        %error,
                        "task write failed"
                    );
                }
            }
            self.reconcile(snapshot).await;
            report.reconciled = Some(self.policy);
        }
        Ok(report)
    }

    /// Create a task at the bottom of `status`.
    pub async fn add_task(&mut self, title: &str, status: Status) -> BoardResult<Task> {
        let new = NewTask {
            title: title.to_string(),
            status,
            rank: Some(append_rank(&self.tasks, status)?),
        };
        let created = self.store.create_task(self.caller, self.board, new).await?;
        self.tasks.push(created.clone());
        Ok(created)
    }

    pub async fn rename_task(&mut self, task_id: TaskId, title: &str) -> BoardResult<Task> {
        let patch = TaskPatch {
            title: Some(title.to_string()),
            ..Default::default()
        };
        let updated = self.store.update_task(self.caller, task_id, patch).await?;
        self.upsert(updated.clone());
        Ok(updated)
    }

    pub async fn delete_task(&mut self, task_id: TaskId) -> BoardResult<()> {
        self.store.delete_task(self.caller, task_id).await?;
        self.tasks.retain(|t| t.id != task_id);
        Ok(())
    }

    /// Fold a notification from another client into the local list.
    ///
    /// Returns false for events that leave the session without a board.
    pub fn apply_event(&mut self, event: &BoardEvent) -> bool {
        match event {
            BoardEvent::TaskAdded { task } | BoardEvent::TaskUpdated { task } => {
                if task.board_id == self.board {
                    self.upsert(task.clone());
                }
            }
            BoardEvent::TasksReordered { changes } => {
                for change in changes {
                    if let Some(task) = self.tasks.iter_mut().find(|t| t.id == change.id) {
                        TaskPatch::from(*change).apply_to(task);
                    }
                }
            }
            BoardEvent::TaskDeleted { task_id } => {
                self.tasks.retain(|t| t.id != *task_id);
            }
            BoardEvent::BoardRenamed { .. } => {}
            BoardEvent::BoardDeleted { board_id } => {
                if *board_id == self.board {
                    self.tasks.clear();
                    return false;
                }
            }
        }
        true
    }

    async fn push(&self, changes: &[TaskChange]) -> Vec<TaskAck> {
        match self.write_mode {
            WriteMode::Batched => {
                match self
                    .store
                    .apply_ordering(self.caller, self.board, changes)
                    .await
                {
                    Ok(()) => changes.iter().map(|c| TaskAck::ok(c.id)).collect(),
                    Err(e) => changes.iter().map(|c| TaskAck::failed(c.id, &e)).collect(),
                }
            }
            WriteMode::PerTask => {
                let writes = changes.iter().map(|change| async move {
                    match self
                        .store
                        .update_task(self.caller, change.id, TaskPatch::from(*change))
                        .await
                    {
                        Ok(_) => TaskAck::ok(change.id),
                        Err(e) => TaskAck::failed(change.id, e),
                    }
                });
                join_all(writes).await
            }
        }
    }

    async fn reconcile(&mut self, snapshot: Vec<Task>) {
        match self.policy {
            ReconcilePolicy::Keep => {}
            ReconcilePolicy::Revert => self.tasks = snapshot,
            ReconcilePolicy::Refetch => {
                if let Err(e) = self.refresh().await {
                    tracing::warn!(
                        board = %self.board,
                        error = %e,
                        "refetch after failed write failed"
                    );
                }
            }
        }
    }

    fn upsert(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }
}
