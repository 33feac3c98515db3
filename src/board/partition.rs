#![forbid(unsafe_code)]

use std::sync::Arc;

use crate::board::TaskSnapshot;
use crate::task::model::{Task, TaskStatus, now_rfc3339};

/// Tasks grouped by status, one ordered bucket per board column.
#[derive(Debug, Clone, Default)]
pub struct StatusBuckets {
    buckets: [Vec<Arc<Task>>; 3],
}

impl StatusBuckets {
    #[must_use]
    pub fn get(&self, status: TaskStatus) -> &[Arc<Task>] {
        &self.buckets[status.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskStatus, &[Arc<Task>])> {
        TaskStatus::ALL
            .into_iter()
            .map(|s| (s, self.buckets[s.index()].as_slice()))
    }

    /// Total number of tasks across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Column and row of a task, if present.
    #[must_use]
    pub fn locate(&self, task_id: &str) -> Option<(TaskStatus, usize)> {
        self.iter().find_map(|(status, tasks)| {
            tasks
                .iter()
                .position(|t| t.id == task_id)
                .map(|row| (status, row))
        })
    }
}

/// Splits `tasks` into status buckets in one pass, keeping input order within each bucket.
#[must_use]
pub fn partition(tasks: &[Arc<Task>]) -> StatusBuckets {
    let mut out = StatusBuckets::default();
    for task in tasks {
        out.buckets[task.status.index()].push(Arc::clone(task));
    }
    out
}

/// Returns a snapshot where `task_id` carries `status`.
///
/// When the task is absent or already has that status the original snapshot is returned
/// unchanged (same pointer), so a controller fed the result will not repartition.
#[must_use]
pub fn with_status(snapshot: &TaskSnapshot, task_id: &str, status: TaskStatus) -> TaskSnapshot {
    let needs_change = snapshot
        .iter()
        .any(|t| t.id == task_id && t.status != status);
    if !needs_change {
        return Arc::clone(snapshot);
    }
    snapshot
        .iter()
        .map(|t| {
            if t.id == task_id {
                let mut patched = Task::clone(t);
                patched.status = status;
                patched.updated_at = now_rfc3339();
                Arc::new(patched)
            } else {
                Arc::clone(t)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::board::snapshot_from;
    use crate::task::model::TaskPriority;

    fn task(id: &str, status: TaskStatus) -> Task {
        let mut t = Task::new(format!("task {id}"), status, TaskPriority::Medium);
        t.id = id.to_owned();
        t
    }

    fn ids(tasks: &[Arc<Task>]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn empty_input_gives_empty_buckets() {
        let buckets = partition(&[]);
        assert!(buckets.is_empty());
        for status in TaskStatus::ALL {
            assert!(buckets.get(status).is_empty());
        }
    }

    #[test]
    fn partition_is_complete_and_disjoint() {
        let statuses = [
            TaskStatus::Completed,
            TaskStatus::Todo,
            TaskStatus::InProgress,
            TaskStatus::Todo,
            TaskStatus::Completed,
            TaskStatus::Todo,
        ];
        let tasks: Vec<Task> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| task(&i.to_string(), *s))
            .collect();
        let snapshot = snapshot_from(tasks);
        let buckets = partition(&snapshot);

        assert_eq!(buckets.len(), snapshot.len());
        let mut seen = HashSet::new();
        for (status, bucket) in buckets.iter() {
            for t in bucket {
                assert_eq!(t.status, status);
                assert!(seen.insert(t.id.clone()), "duplicate {}", t.id);
            }
        }
        let all: HashSet<String> = snapshot.iter().map(|t| t.id.clone()).collect();
        assert_eq!(seen, all);
    }

    #[test]
    fn partition_preserves_relative_order() {
        let snapshot = snapshot_from(vec![
            task("c", TaskStatus::Todo),
            task("x", TaskStatus::Completed),
            task("a", TaskStatus::Todo),
            task("b", TaskStatus::Todo),
        ]);
        let buckets = partition(&snapshot);
        assert_eq!(ids(buckets.get(TaskStatus::Todo)), ["c", "a", "b"]);
        assert_eq!(ids(buckets.get(TaskStatus::Completed)), ["x"]);
        assert_eq!(buckets.locate("b"), Some((TaskStatus::Todo, 2)));
        assert_eq!(buckets.locate("nope"), None);
    }

    #[test]
    fn with_status_patches_one_task_and_shares_the_rest() {
        let snapshot = snapshot_from(vec![
            task("1", TaskStatus::Todo),
            task("2", TaskStatus::InProgress),
        ]);
        let patched = with_status(&snapshot, "1", TaskStatus::Completed);
        assert!(!Arc::ptr_eq(&snapshot, &patched));
        assert_eq!(patched[0].status, TaskStatus::Completed);
        assert!(Arc::ptr_eq(&snapshot[1], &patched[1]));
        assert_eq!(snapshot[0].status, TaskStatus::Todo);
    }

    #[test]
    fn with_status_is_identity_for_noops() {
        let snapshot = snapshot_from(vec![task("1", TaskStatus::Todo)]);
        assert!(Arc::ptr_eq(
            &snapshot,
            &with_status(&snapshot, "1", TaskStatus::Todo)
        ));
        assert!(Arc::ptr_eq(
            &snapshot,
            &with_status(&snapshot, "missing", TaskStatus::Completed)
        ));
    }
}
