//! Drag-and-drop ordering engine.
//!
//! Reconciles a single drag-and-drop gesture with the per-(board, status)
//! total order of tasks. The engine is pure: it takes the full task list of a
//! board plus a [`MoveDescriptor`] and returns the updated list together with
//! the minimal set of `(status, rank)` changes that must be persisted.
//!
//! Every bucket touched by a move is renumbered to contiguous ranks
//! `0..n-1`. Buckets that are not touched keep whatever ranks they had, so
//! gaps left by deletions are tolerated until the next move in that column.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Rank, Status, Task, TaskChange, TaskId};

/// One end of a drag gesture: a column label and a 0-based index into the
/// rank-sorted view of that column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragLocation {
    pub status: String,
    /// Negative wire values read as 0; past-the-end is clamped by the engine.
    #[serde(deserialize_with = "clamped_index")]
    pub index: usize,
}

fn clamped_index<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(usize::try_from(raw.max(0)).unwrap_or(usize::MAX))
}

impl DragLocation {
    pub fn new(status: impl Into<String>, index: usize) -> Self {
        Self {
            status: status.into(),
            index,
        }
    }

    pub fn at(status: Status, index: usize) -> Self {
        Self::new(status.as_str(), index)
    }
}

/// Structured description of a single drag-and-drop gesture.
///
/// `destination` is `None` when the card was dropped outside any column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDescriptor {
    pub task_id: TaskId,
    pub source: DragLocation,
    #[serde(default)]
    pub destination: Option<DragLocation>,
}

impl MoveDescriptor {
    pub fn new(task_id: TaskId, source: DragLocation, destination: DragLocation) -> Self {
        Self {
            task_id,
            source,
            destination: Some(destination),
        }
    }

    /// A gesture that ended outside every column.
    pub fn dropped_outside(task_id: TaskId, source: DragLocation) -> Self {
        Self {
            task_id,
            source,
            destination: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("invalid column: {0}")]
    InvalidColumn(String),

    /// The caller's view of the board is out of date.
    #[error("task {task_id} is in {actual}, not {expected}")]
    StaleMove {
        task_id: TaskId,
        expected: Status,
        actual: Status,
    },
}

/// Result of applying a move to a board's task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Full task list, in input order, with updated status/rank fields.
    pub tasks: Vec<Task>,
    /// Tasks whose `(status, rank)` differs from before the move.
    pub changed: Vec<TaskChange>,
}

impl MoveOutcome {
    fn unchanged(tasks: &[Task]) -> Self {
        Self {
            tasks: tasks.to_vec(),
            changed: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Apply a drag-and-drop move to `tasks`.
///
/// Returns an error without touching anything when the destination column is
/// unknown, the task is missing, or the task is no longer in the source
/// column. A move without a destination is a valid no-op.
pub fn plan_move(tasks: &[Task], mv: &MoveDescriptor) -> Result<MoveOutcome, OrderingError> {
    let Some(destination) = &mv.destination else {
        return Ok(MoveOutcome::unchanged(tasks));
    };

    let dest_status = parse_column(&destination.status)?;
    let source_status = parse_column(&mv.source.status)?;

    let moved = tasks
        .iter()
        .find(|t| t.id == mv.task_id)
        .ok_or(OrderingError::TaskNotFound(mv.task_id))?;

    if moved.status != source_status {
        return Err(OrderingError::StaleMove {
            task_id: moved.id,
            expected: source_status,
            actual: moved.status,
        });
    }

    let mut source_bucket = bucket_ids(tasks, source_status);
    let current_index = source_bucket
        .iter()
        .position(|id| *id == moved.id)
        .ok_or(OrderingError::TaskNotFound(moved.id))?;
    source_bucket.remove(current_index);

    let mut assignments: HashMap<TaskId, (Status, Rank)> = HashMap::new();

    if dest_status == source_status {
        let index = destination.index.min(source_bucket.len());
        if index == current_index {
            return Ok(MoveOutcome::unchanged(tasks));
        }
        source_bucket.insert(index, moved.id);
        renumber(&source_bucket, source_status, &mut assignments);
    } else {
        let mut dest_bucket = bucket_ids(tasks, dest_status);
        let index = destination.index.min(dest_bucket.len());
        dest_bucket.insert(index, moved.id);
        renumber(&dest_bucket, dest_status, &mut assignments);
        renumber(&source_bucket, source_status, &mut assignments);
    }

    let mut updated = Vec::with_capacity(tasks.len());
    let mut changed = Vec::new();
    for task in tasks {
        let mut task = task.clone();
        if let Some(&(status, rank)) = assignments.get(&task.id) {
            if task.status != status || task.rank != rank {
                task.status = status;
                task.rank = rank;
                changed.push(TaskChange::of(&task));
            }
        }
        updated.push(task);
    }

    Ok(MoveOutcome {
        tasks: updated,
        changed,
    })
}

/// Rank for a task appended to `status`: one past the current maximum, or 0
/// for an empty column.
///
/// `None` when the column already holds a task at `Rank::MAX`.
pub fn next_rank(tasks: &[Task], status: Status) -> Option<Rank> {
    match tasks
        .iter()
        .filter(|t| t.status == status)
        .map(|t| t.rank)
        .max()
    {
        Some(max) => max.checked_add(1),
        None => Some(0),
    }
}

/// Partition tasks into rank-sorted buckets, one per column.
///
/// Every column is present in the result, empty or not.
pub fn columns(tasks: &[Task]) -> BTreeMap<Status, Vec<Task>> {
    let mut buckets: BTreeMap<Status, Vec<Task>> =
        Status::ALL.into_iter().map(|s| (s, Vec::new())).collect();
    for task in tasks {
        buckets.entry(task.status).or_default().push(task.clone());
    }
    for bucket in buckets.values_mut() {
        bucket.sort_by_key(Task::order_key);
    }
    buckets
}

/// Where a task currently sits: its column and index in the sorted view.
pub fn locate(tasks: &[Task], task_id: TaskId) -> Option<(Status, usize)> {
    let task = tasks.iter().find(|t| t.id == task_id)?;
    let index = bucket_ids(tasks, task.status)
        .iter()
        .position(|id| *id == task_id)?;
    Some((task.status, index))
}

fn parse_column(label: &str) -> Result<Status, OrderingError> {
    label
        .parse()
        .map_err(|_| OrderingError::InvalidColumn(label.to_string()))
}

fn bucket_ids(tasks: &[Task], status: Status) -> Vec<TaskId> {
    let mut bucket: Vec<&Task> = tasks.iter().filter(|t| t.status == status).collect();
    bucket.sort_by_key(|t| t.order_key());
    bucket.into_iter().map(|t| t.id).collect()
}

fn renumber(bucket: &[TaskId], status: Status, out: &mut HashMap<TaskId, (Status, Rank)>) {
    for (rank, id) in bucket.iter().enumerate() {
        out.insert(*id, (status, rank as Rank));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn task(board: Uuid, title: &str, status: Status, rank: Rank) -> Task {
        Task::new(board, title, status, rank)
    }

    fn titles(tasks: &[Task], status: Status) -> Vec<(String, Rank)> {
        columns(tasks)
            .remove(&status)
            .unwrap_or_default()
            .into_iter()
            .map(|t| (t.title, t.rank))
            .collect()
    }

    fn changed_ids(outcome: &MoveOutcome) -> Vec<TaskId> {
        let mut ids: Vec<_> = outcome.changed.iter().map(|c| c.id).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_cross_column_move_renumbers_both_buckets() {
        let board = Uuid::new_v4();
        let a = task(board, "A", Status::Todo, 0);
        let b = task(board, "B", Status::Todo, 1);
        let tasks = vec![a.clone(), b.clone()];

        let mv = MoveDescriptor::new(
            a.id,
            DragLocation::at(Status::Todo, 0),
            DragLocation::at(Status::InProgress, 0),
        );
        let outcome = plan_move(&tasks, &mv).unwrap();

        assert_eq!(titles(&outcome.tasks, Status::Todo), vec![("B".into(), 0)]);
        assert_eq!(
            titles(&outcome.tasks, Status::InProgress),
            vec![("A".into(), 0)]
        );

        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(changed_ids(&outcome), expected);

        let moved = outcome.changed.iter().find(|c| c.id == a.id).unwrap();
        assert_eq!(moved.status, Status::InProgress);
    }

    #[test]
    fn test_same_column_move_to_front() {
        let board = Uuid::new_v4();
        let a = task(board, "A", Status::Todo, 0);
        let b = task(board, "B", Status::Todo, 1);
        let c = task(board, "C", Status::Todo, 2);
        let tasks = vec![a, b, c.clone()];

        let mv = MoveDescriptor::new(
            c.id,
            DragLocation::at(Status::Todo, 2),
            DragLocation::at(Status::Todo, 0),
        );
        let outcome = plan_move(&tasks, &mv).unwrap();

        assert_eq!(
            titles(&outcome.tasks, Status::Todo),
            vec![("C".into(), 0), ("A".into(), 1), ("B".into(), 2)]
        );
        assert_eq!(outcome.changed.len(), 3);
    }

    #[test]
    fn test_same_column_move_leaves_other_columns_alone() {
        let board = Uuid::new_v4();
        let a = task(board, "A", Status::Todo, 0);
        let b = task(board, "B", Status::Todo, 1);
        let done = task(board, "Done", Status::Complete, 7);
        let tasks = vec![a.clone(), b, done.clone()];

        let mv = MoveDescriptor::new(
            a.id,
            DragLocation::at(Status::Todo, 0),
            DragLocation::at(Status::Todo, 1),
        );
        let outcome = plan_move(&tasks, &mv).unwrap();

        assert!(outcome.changed.iter().all(|c| c.id != done.id));
        let kept = outcome.tasks.iter().find(|t| t.id == done.id).unwrap();
        assert_eq!(kept.rank, 7);
    }

    #[test]
    fn test_noop_move_changes_nothing_even_with_gaps() {
        let board = Uuid::new_v4();
        let a = task(board, "A", Status::Todo, 0);
        let b = task(board, "B", Status::Todo, 5);
        let c = task(board, "C", Status::Todo, 9);
        let tasks = vec![a, b.clone(), c];

        let mv = MoveDescriptor::new(
            b.id,
            DragLocation::at(Status::Todo, 1),
            DragLocation::at(Status::Todo, 1),
        );
        let outcome = plan_move(&tasks, &mv).unwrap();

        assert!(outcome.is_noop());
        assert_eq!(outcome.tasks, tasks);
    }

    #[test]
    fn test_drop_outside_columns_is_noop() {
        let board = Uuid::new_v4();
        let a = task(board, "A", Status::Todo, 0);
        let tasks = vec![a.clone()];

        let mv = MoveDescriptor::dropped_outside(a.id, DragLocation::at(Status::Todo, 0));
        let outcome = plan_move(&tasks, &mv).unwrap();

        assert!(outcome.is_noop());
        assert_eq!(outcome.tasks, tasks);
    }

    #[test]
    fn test_destination_index_past_end_appends() {
        let board = Uuid::new_v4();
        let a = task(board, "A", Status::Todo, 0);
        let x = task(board, "X", Status::Complete, 0);
        let y = task(board, "Y", Status::Complete, 1);
        let tasks = vec![a.clone(), x, y];

        let mv = MoveDescriptor::new(
            a.id,
            DragLocation::at(Status::Todo, 0),
            DragLocation::at(Status::Complete, 42),
        );
        let outcome = plan_move(&tasks, &mv).unwrap();

        assert_eq!(
            titles(&outcome.tasks, Status::Complete),
            vec![("X".into(), 0), ("Y".into(), 1), ("A".into(), 2)]
        );
        assert!(titles(&outcome.tasks, Status::Todo).is_empty());
    }

    #[test]
    fn test_same_column_index_past_end_moves_to_last() {
        let board = Uuid::new_v4();
        let a = task(board, "A", Status::Todo, 0);
        let b = task(board, "B", Status::Todo, 1);
        let tasks = vec![a.clone(), b];

        let mv = MoveDescriptor::new(
            a.id,
            DragLocation::at(Status::Todo, 0),
            DragLocation::at(Status::Todo, 10),
        );
        let outcome = plan_move(&tasks, &mv).unwrap();

        assert_eq!(
            titles(&outcome.tasks, Status::Todo),
            vec![("B".into(), 0), ("A".into(), 1)]
        );
    }

    #[test]
    fn test_move_into_empty_column_gets_rank_zero() {
        let board = Uuid::new_v4();
        let a = task(board, "A", Status::Todo, 4);
        let tasks = vec![a.clone()];

        let mv = MoveDescriptor::new(
            a.id,
            DragLocation::at(Status::Todo, 0),
            DragLocation::at(Status::Complete, 0),
        );
        let outcome = plan_move(&tasks, &mv).unwrap();

        assert_eq!(
            outcome.changed,
            vec![TaskChange {
                id: a.id,
                status: Status::Complete,
                rank: 0
            }]
        );
    }

    #[test]
    fn test_unknown_task_reports_not_found() {
        let board = Uuid::new_v4();
        let tasks = vec![task(board, "A", Status::Todo, 0)];
        let missing = Uuid::new_v4();

        let mv = MoveDescriptor::new(
            missing,
            DragLocation::at(Status::Todo, 0),
            DragLocation::at(Status::Complete, 0),
        );

        assert_eq!(
            plan_move(&tasks, &mv),
            Err(OrderingError::TaskNotFound(missing))
        );
    }

    #[test]
    fn test_unknown_destination_column_rejected() {
        let board = Uuid::new_v4();
        let a = task(board, "A", Status::Todo, 0);
        let tasks = vec![a.clone()];

        let mv = MoveDescriptor::new(
            a.id,
            DragLocation::at(Status::Todo, 0),
            DragLocation::new("Archived", 0),
        );

        assert_eq!(
            plan_move(&tasks, &mv),
            Err(OrderingError::InvalidColumn("Archived".to_string()))
        );
    }

    #[test]
    fn test_stale_source_column_rejected() {
        let board = Uuid::new_v4();
        let a = task(board, "A", Status::InProgress, 0);
        let tasks = vec![a.clone()];

        let mv = MoveDescriptor::new(
            a.id,
            DragLocation::at(Status::Todo, 0),
            DragLocation::at(Status::Complete, 0),
        );

        assert!(matches!(
            plan_move(&tasks, &mv),
            Err(OrderingError::StaleMove {
                expected: Status::Todo,
                actual: Status::InProgress,
                ..
            })
        ));
    }

    #[test]
    fn test_equal_ranks_break_ties_by_id() {
        let board = Uuid::new_v4();
        let mut a = task(board, "A", Status::Todo, 0);
        let mut b = task(board, "B", Status::Todo, 0);
        if a.id > b.id {
            std::mem::swap(&mut a.id, &mut b.id);
        }
        let tasks = vec![b.clone(), a.clone()];

        assert_eq!(locate(&tasks, a.id), Some((Status::Todo, 0)));
        assert_eq!(locate(&tasks, b.id), Some((Status::Todo, 1)));
    }

    #[test]
    fn test_next_rank() {
        let board = Uuid::new_v4();
        let tasks = vec![
            task(board, "A", Status::Todo, 0),
            task(board, "B", Status::Todo, 6),
            task(board, "C", Status::Complete, 2),
        ];

        assert_eq!(next_rank(&tasks, Status::Todo), Some(7));
        assert_eq!(next_rank(&tasks, Status::Complete), Some(3));
        assert_eq!(next_rank(&tasks, Status::InProgress), Some(0));
    }

    #[test]
    fn test_next_rank_at_rank_max() {
        let board = Uuid::new_v4();
        let tasks = vec![
            task(board, "Top", Status::Todo, Rank::MAX),
            task(board, "Low", Status::Complete, Rank::MIN),
        ];

        assert_eq!(next_rank(&tasks, Status::Todo), None);
        assert_eq!(next_rank(&tasks, Status::Complete), Some(Rank::MIN + 1));
    }

    #[test]
    fn test_negative_drag_index_reads_as_top() {
        let location: DragLocation =
            serde_json::from_value(serde_json::json!({ "status": "To-Do", "index": -3 })).unwrap();
        assert_eq!(location, DragLocation::at(Status::Todo, 0));

        let wire = serde_json::json!({ "status": "Complete", "index": 4 });
        let location: DragLocation = serde_json::from_value(wire).unwrap();
        assert_eq!(location.index, 4);

        let fractional = serde_json::from_value::<DragLocation>(
            serde_json::json!({ "status": "Complete", "index": 1.5 }),
        );
        assert!(fractional.is_err());
    }

    #[test]
    fn test_columns_always_has_every_status() {
        let buckets = columns(&[]);
        assert_eq!(buckets.len(), Status::ALL.len());
        assert!(buckets.values().all(Vec::is_empty));
    }
}
