//! Board, share and task operations.
//!
//! `BoardService` is the server-side face of every persistence operation:
//! it checks the caller through [`crate::access`], writes through
//! [`Database`], and publishes a [`BoardEvent`] after each successful write.

use std::sync::Arc;

use crate::access::{self, Permission};
use crate::board::{Board, BoardId, User, UserId, UserSummary};
use crate::credentials;
use crate::db::Database;
use crate::error::{BoardError, BoardResult};
use crate::events::{BoardEvent, EventHub};
use crate::task::{
    self, MoveDescriptor, MoveOutcome, Rank, Status, Task, TaskChange, TaskId, TaskPatch,
};

/// Fields for a new task. Without a rank the task is appended to its column.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub status: Status,
    pub rank: Option<Rank>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, status: Status) -> Self {
        Self {
            title: title.into(),
            status,
            rank: None,
        }
    }
}

#[derive(Clone)]
pub struct BoardService {
    db: Arc<Database>,
    events: Arc<EventHub>,
    password_iterations: u32,
}

impl BoardService {
    pub fn new(db: Arc<Database>, events: Arc<EventHub>, password_iterations: u32) -> Self {
        Self {
            db,
            events,
            password_iterations,
        }
    }

    pub fn events(&self) -> &Arc<EventHub> {
        &self.events
    }

    // ─────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────

    pub async fn register(&self, username: &str, password: &str) -> BoardResult<UserSummary> {
        let username = username.trim();
        if username.is_empty() {
            return Err(BoardError::invalid_input("username cannot be empty"));
        }
        if password.is_empty() {
            return Err(BoardError::invalid_input("password cannot be empty"));
        }

        let password = password.to_string();
        let iterations = self.password_iterations;
        let hash = off_runtime(move || credentials::hash_password(&password, iterations)).await?;
        let user = User::new(username, hash);
        self.db.insert_user(&user)?;

        tracing::info!(user = %user.id, username = %user.username, "registered user");
        Ok(user.summary())
    }

    /// Check a username/password pair. Unknown user and wrong password give
    /// the same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> BoardResult<UserSummary> {
        let user = self.db.find_user_by_username(username.trim())?;
        let password = password.to_string();
        let iterations = self.password_iterations;

        let verified = off_runtime(move || match user {
            Some(user) if credentials::verify_password(&password, &user.password_hash) => {
                Some(user.summary())
            }
            Some(_) => None,
            None => {
                credentials::dummy_verify(&password, iterations);
                None
            }
        })
        .await?;
        verified.ok_or(BoardError::InvalidCredentials)
    }

    pub async fn user(&self, id: UserId) -> BoardResult<Option<UserSummary>> {
        Ok(self.db.get_user(id)?.map(|u| u.summary()))
    }

    pub async fn list_users(&self, caller: UserId) -> BoardResult<Vec<UserSummary>> {
        self.db.list_users_except(caller)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Boards
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_boards(&self, caller: UserId) -> BoardResult<Vec<Board>> {
        self.db.boards_for_user(caller)
    }

    pub async fn get_board(&self, caller: UserId, board_id: BoardId) -> BoardResult<Board> {
        let (board, _) = access::authorize(&self.db, caller, board_id, Permission::Collaborate)?;
        Ok(board)
    }

    pub async fn create_board(&self, caller: UserId, name: &str) -> BoardResult<Board> {
        let name = board_name(name)?;
        let board = self.db.create_board(name, caller)?;
        tracing::info!(board = %board.id, owner = %caller, "created board");
        Ok(board)
    }

    pub async fn rename_board(
        &self,
        caller: UserId,
        board_id: BoardId,
        name: &str,
    ) -> BoardResult<Board> {
        let name = board_name(name)?;
        access::authorize(&self.db, caller, board_id, Permission::Manage)?;
        let board = self
            .db
            .rename_board(board_id, name)?
            .ok_or_else(|| BoardError::not_found("board", board_id))?;

        self.events
            .publish(board_id, BoardEvent::BoardRenamed { board: board.clone() })
            .await;
        Ok(board)
    }

    /// Delete a board with its tasks and share grants.
    pub async fn delete_board(&self, caller: UserId, board_id: BoardId) -> BoardResult<()> {
        access::authorize(&self.db, caller, board_id, Permission::Manage)?;
        if !self.db.delete_board(board_id)? {
            return Err(BoardError::not_found("board", board_id));
        }
        tracing::info!(board = %board_id, "deleted board");

        self.events
            .publish(board_id, BoardEvent::BoardDeleted { board_id })
            .await;
        self.events.close(board_id).await;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Shares
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_shares(&self, caller: UserId, board_id: BoardId) -> BoardResult<Vec<UserId>> {
        access::authorize(&self.db, caller, board_id, Permission::Collaborate)?;
        self.db.list_shares(board_id)
    }

    /// Grant `user` access. Returns false if the grant already existed.
    pub async fn create_share(
        &self,
        caller: UserId,
        board_id: BoardId,
        user: UserId,
    ) -> BoardResult<bool> {
        let (board, _) = access::authorize(&self.db, caller, board_id, Permission::Manage)?;
        if board.is_owned_by(user) {
            return Err(BoardError::invalid_input("cannot share a board with its owner"));
        }
        if self.db.get_user(user)?.is_none() {
            return Err(BoardError::not_found("user", user));
        }

        let created = self.db.insert_share(board_id, user)?;
        if created {
            tracing::info!(board = %board_id, user = %user, "shared board");
        }
        Ok(created)
    }

    pub async fn delete_share(
        &self,
        caller: UserId,
        board_id: BoardId,
        user: UserId,
    ) -> BoardResult<()> {
        access::authorize(&self.db, caller, board_id, Permission::Manage)?;
        if !self.db.delete_share(board_id, user)? {
            return Err(BoardError::not_found("share", user));
        }
        tracing::info!(board = %board_id, user = %user, "revoked share");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tasks
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_tasks(&self, caller: UserId, board_id: BoardId) -> BoardResult<Vec<Task>> {
        access::authorize(&self.db, caller, board_id, Permission::Collaborate)?;
        self.db.list_tasks(board_id)
    }

    pub async fn create_task(
        &self,
        caller: UserId,
        board_id: BoardId,
        new: NewTask,
    ) -> BoardResult<Task> {
        let title = task_title(&new.title)?;
        access::authorize(&self.db, caller, board_id, Permission::Collaborate)?;

        let rank = match new.rank {
            Some(rank) => rank,
            None => append_rank(&self.db.list_tasks(board_id)?, new.status)?,
        };
        let task = Task::new(board_id, title, new.status, rank);
        self.db.insert_task(&task)?;

        tracing::debug!(
            task = %task.id,
            board = %board_id,
            status = %task.status,
            rank,
            "created task"
        );
        self.events
            .publish(board_id, BoardEvent::TaskAdded { task: task.clone() })
            .await;
        Ok(task)
    }

    pub async fn update_task(
        &self,
        caller: UserId,
        task_id: TaskId,
        patch: TaskPatch,
    ) -> BoardResult<Task> {
        let patch = TaskPatch {
            title: patch.title.as_deref().map(task_title).transpose()?.map(str::to_string),
            ..patch
        };
        let current = access::authorize_task(&self.db, caller, task_id)?;
        if patch.is_empty() {
            return Ok(current);
        }

        let task = self
            .db
            .update_task(task_id, &patch)?
            .ok_or_else(|| BoardError::not_found("task", task_id))?;

        self.events
            .publish(task.board_id, BoardEvent::TaskUpdated { task: task.clone() })
            .await;
        Ok(task)
    }

    pub async fn delete_task(&self, caller: UserId, task_id: TaskId) -> BoardResult<()> {
        let task = access::authorize_task(&self.db, caller, task_id)?;
        if !self.db.delete_task(task_id)? {
            return Err(BoardError::not_found("task", task_id));
        }

        self.events
            .publish(task.board_id, BoardEvent::TaskDeleted { task_id })
            .await;
        Ok(())
    }

    /// Persist a batch of rank/status changes atomically.
    pub async fn apply_ordering(
        &self,
        caller: UserId,
        board_id: BoardId,
        changes: &[TaskChange],
    ) -> BoardResult<()> {
        access::authorize(&self.db, caller, board_id, Permission::Collaborate)?;
        if changes.is_empty() {
            return Ok(());
        }
        self.db.apply_ordering(board_id, changes)?;

        tracing::debug!(board = %board_id, changed = changes.len(), "applied ordering");
        self.events
            .publish(
                board_id,
                BoardEvent::TasksReordered {
                    changes: changes.to_vec(),
                },
            )
            .await;
        Ok(())
    }

    /// Run a drag-and-drop move against the stored board and persist the
    /// changed set in one batch.
    pub async fn move_task(
        &self,
        caller: UserId,
        board_id: BoardId,
        mv: &MoveDescriptor,
    ) -> BoardResult<MoveOutcome> {
        access::authorize(&self.db, caller, board_id, Permission::Collaborate)?;
        let tasks = self.db.list_tasks(board_id)?;
        let outcome = task::plan_move(&tasks, mv)?;

        if !outcome.is_noop() {
            self.apply_ordering(caller, board_id, &outcome.changed).await?;
        }
        Ok(outcome)
    }
}

/// Rank one past the bottom of `status`.
pub(crate) fn append_rank(tasks: &[Task], status: Status) -> BoardResult<Rank> {
    task::next_rank(tasks, status).ok_or_else(|| {
        BoardError::invalid_input(format!("no rank left below the last task in {}", status))
    })
}

/// Key derivation is CPU-bound; keep it off the async workers.
async fn off_runtime<T, F>(work: F) -> BoardResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BoardError::Persistence(format!("credential task failed: {}", e)))
}

fn board_name(name: &str) -> BoardResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BoardError::invalid_input("board name cannot be empty"));
    }
    Ok(name)
}

fn task_title(title: &str) -> BoardResult<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(BoardError::invalid_input("task title cannot be empty"));
    }
    Ok(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::DragLocation;
    use uuid::Uuid;

    struct Fixture {
        service: BoardService,
        owner: UserId,
        guest: UserId,
        stranger: UserId,
        board: BoardId,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let service = BoardService::new(db, Arc::new(EventHub::default()), 10);
        let owner = service.register("owner", "pw").await.unwrap().id;
        let guest = service.register("guest", "pw").await.unwrap().id;
        let stranger = service.register("stranger", "pw").await.unwrap().id;
        let board = service.create_board(owner, "Sprint").await.unwrap().id;
        service.create_share(owner, board, guest).await.unwrap();
        Fixture {
            service,
            owner,
            guest,
            stranger,
            board,
        }
    }

    #[tokio::test]
    async fn test_authenticate() {
        let f = fixture().await;
        let user = f.service.authenticate("owner", "pw").await.unwrap();
        assert_eq!(user.id, f.owner);

        assert!(matches!(
            f.service.authenticate("owner", "nope").await,
            Err(BoardError::InvalidCredentials)
        ));
        assert!(matches!(
            f.service.authenticate("nobody", "pw").await,
            Err(BoardError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_does_not_block_runtime() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let service = BoardService::new(db, Arc::new(EventHub::default()), 300_000);

        // Single-threaded runtime: a timer can only fire while the
        // derivation runs elsewhere.
        tokio::select! {
            biased;
            _ = service.authenticate("nobody", "pw") => panic!("derivation ran on the runtime"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(1)) => {}
        }
    }

    #[tokio::test]
    async fn test_default_rank_at_rank_max_is_rejected() {
        let f = fixture().await;
        let top = NewTask {
            rank: Some(Rank::MAX),
            ..NewTask::new("Top", Status::Todo)
        };
        f.service.create_task(f.owner, f.board, top).await.unwrap();

        let err = f
            .service
            .create_task(f.owner, f.board, NewTask::new("Next", Status::Todo))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidInput(_)));
        assert_eq!(f.service.list_tasks(f.owner, f.board).await.unwrap().len(), 1);

        let other = f
            .service
            .create_task(f.owner, f.board, NewTask::new("Done", Status::Complete))
            .await
            .unwrap();
        assert_eq!(other.rank, 0);
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let f = fixture().await;
        assert!(matches!(
            f.service.register("  ", "pw").await,
            Err(BoardError::InvalidInput(_))
        ));
        assert!(matches!(
            f.service.register("owner", "pw").await,
            Err(BoardError::UsernameTaken(_))
        ));
    }

    #[tokio::test]
    async fn test_grantee_works_with_tasks_but_cannot_manage() {
        let f = fixture().await;
        let task = f
            .service
            .create_task(f.guest, f.board, NewTask::new("Guest task", Status::Todo))
            .await
            .unwrap();
        assert_eq!(task.rank, 0);

        let err = f
            .service
            .rename_board(f.guest, f.board, "Mine now")
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Unauthorized(_)));

        let err = f.service.delete_board(f.guest, f.board).await.unwrap_err();
        assert!(matches!(err, BoardError::Unauthorized(_)));

        let err = f
            .service
            .create_share(f.guest, f.board, f.stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Unauthorized(_)));

        f.service.delete_task(f.guest, task.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_stranger_is_locked_out() {
        let f = fixture().await;
        assert!(matches!(
            f.service.list_tasks(f.stranger, f.board).await,
            Err(BoardError::Unauthorized(_))
        ));
        assert!(f.service.list_boards(f.stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_task_appends_to_column() {
        let f = fixture().await;
        for title in ["one", "two", "three"] {
            f.service
                .create_task(f.owner, f.board, NewTask::new(title, Status::Todo))
                .await
                .unwrap();
        }
        let done = f
            .service
            .create_task(f.owner, f.board, NewTask::new("done", Status::Complete))
            .await
            .unwrap();

        let tasks = f.service.list_tasks(f.owner, f.board).await.unwrap();
        let ranks: Vec<_> = tasks
            .iter()
            .filter(|t| t.status == Status::Todo)
            .map(|t| t.rank)
            .collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert_eq!(done.rank, 0);
    }

    #[tokio::test]
    async fn test_update_task_keeps_title_when_omitted() {
        let f = fixture().await;
        let task = f
            .service
            .create_task(f.owner, f.board, NewTask::new("Title", Status::Todo))
            .await
            .unwrap();

        let updated = f
            .service
            .update_task(
                f.guest,
                task.id,
                TaskPatch {
                    status: Some(Status::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Title");
        assert_eq!(updated.status, Status::InProgress);

        let err = f
            .service
            .update_task(
                f.owner,
                task.id,
                TaskPatch {
                    title: Some("   ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_move_task_persists_and_publishes() {
        let f = fixture().await;
        let a = f
            .service
            .create_task(f.owner, f.board, NewTask::new("A", Status::Todo))
            .await
            .unwrap();
        let b = f
            .service
            .create_task(f.owner, f.board, NewTask::new("B", Status::Todo))
            .await
            .unwrap();
        let mut rx = f.service.events().subscribe(f.board).await;

        let mv = MoveDescriptor::new(
            a.id,
            DragLocation::at(Status::Todo, 0),
            DragLocation::at(Status::InProgress, 0),
        );
        let outcome = f.service.move_task(f.guest, f.board, &mv).await.unwrap();
        assert_eq!(outcome.changed.len(), 2);

        let stored = f.service.list_tasks(f.owner, f.board).await.unwrap();
        let a_now = stored.iter().find(|t| t.id == a.id).unwrap();
        let b_now = stored.iter().find(|t| t.id == b.id).unwrap();
        assert_eq!((a_now.status, a_now.rank), (Status::InProgress, 0));
        assert_eq!((b_now.status, b_now.rank), (Status::Todo, 0));

        match rx.recv().await.unwrap() {
            BoardEvent::TasksReordered { changes } => assert_eq!(changes.len(), 2),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_move_with_unknown_task_changes_nothing() {
        let f = fixture().await;
        let a = f
            .service
            .create_task(f.owner, f.board, NewTask::new("A", Status::Todo))
            .await
            .unwrap();

        let mv = MoveDescriptor::new(
            Uuid::new_v4(),
            DragLocation::at(Status::Todo, 0),
            DragLocation::at(Status::Complete, 0),
        );
        let err = f.service.move_task(f.owner, f.board, &mv).await.unwrap_err();
        assert!(matches!(err, BoardError::TaskNotFound(_)));

        let stored = f.service.list_tasks(f.owner, f.board).await.unwrap();
        assert_eq!(stored, vec![a]);
    }

    #[tokio::test]
    async fn test_share_rules() {
        let f = fixture().await;
        assert!(!f.service.create_share(f.owner, f.board, f.guest).await.unwrap());
        assert!(matches!(
            f.service.create_share(f.owner, f.board, f.owner).await,
            Err(BoardError::InvalidInput(_))
        ));
        assert!(matches!(
            f.service.create_share(f.owner, f.board, Uuid::new_v4()).await,
            Err(BoardError::NotFound { resource: "user", .. })
        ));

        assert_eq!(
            f.service.list_shares(f.guest, f.board).await.unwrap(),
            vec![f.guest]
        );
        f.service.delete_share(f.owner, f.board, f.guest).await.unwrap();
        assert!(matches!(
            f.service.delete_share(f.owner, f.board, f.guest).await,
            Err(BoardError::NotFound { resource: "share", .. })
        ));
        assert!(matches!(
            f.service.list_tasks(f.guest, f.board).await,
            Err(BoardError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_board_closes_event_stream() {
        let f = fixture().await;
        let mut rx = f.service.events().subscribe(f.board).await;
        f.service.delete_board(f.owner, f.board).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            BoardEvent::BoardDeleted { board_id: f.board }
        );
        assert!(rx.recv().await.is_err());
        assert!(matches!(
            f.service.list_tasks(f.owner, f.board).await,
            Err(BoardError::NotFound { .. })
        ));
    }
}
