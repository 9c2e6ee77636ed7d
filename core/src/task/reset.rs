//! Reset operation: transition tasks back to `not-started` so they can be
//! re-executed, clearing their timing fields.

use crate::error::StateError;

use super::model::TaskStatus;
use super::set::TaskSet;

/// Selection of tasks to reset. Filters compose conjunctively; at least one
/// of `all`, `status`, or `start_from` must be set (the caller enforces
/// that before building the filter).
#[derive(Debug, Clone, Default)]
pub struct ResetFilter {
    pub all: bool,
    pub status: Option<TaskStatus>,
    pub batch: Option<i64>,
    /// Reset this task and everything after it in (batch, priority) order.
    /// Unlike the scheduler's permissive `start_from`, a missing anchor here
    /// is a hard error: resetting is destructive and a typo must not
    /// silently widen the selection.
    pub start_from: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetOutcome {
    /// Tasks actually transitioned back to `not-started`.
    pub reset: usize,
    /// Tasks that were already clean; reported separately, never counted as reset.
    pub already_clean: usize,
}

pub fn reset_tasks(set: &mut TaskSet, filter: &ResetFilter) -> Result<ResetOutcome, StateError> {
    let mut selected: Vec<usize> = (0..set.tasks.len()).collect();

    if let Some(batch) = filter.batch {
        selected.retain(|&i| set.tasks[i].batch == batch);
    }
    if let Some(status) = filter.status {
        selected.retain(|&i| set.tasks[i].status == status);
    }
    if let Some(anchor) = &filter.start_from {
        selected.sort_by_key(|&i| (set.tasks[i].batch, set.tasks[i].priority));
        let pos = selected
            .iter()
            .position(|&i| set.tasks[i].task_no == *anchor)
            .ok_or_else(|| StateError::UnknownTask(anchor.clone()))?;
        selected.drain(..pos);
    }

    let mut outcome = ResetOutcome::default();
    for i in selected {
        let task = &mut set.tasks[i];
        if task.status == TaskStatus::NotStarted && task.elapsed_seconds.is_none() {
            outcome.already_clean += 1;
            continue;
        }
        task.status = TaskStatus::NotStarted;
        task.elapsed_seconds = None;
        task.last_run_at = None;
        outcome.reset += 1;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::Task;

    fn task(no: &str, batch: i64, priority: i64, status: TaskStatus) -> Task {
        let mut t = Task::new(no);
        t.batch = batch;
        t.priority = priority;
        t.status = status;
        if status != TaskStatus::NotStarted {
            t.elapsed_seconds = Some(42.0);
            t.last_run_at = Some("2026-08-30T10:00:00".to_string());
        }
        t
    }

    #[test]
    fn reset_is_idempotent_on_clean_tasks() {
        let mut set = TaskSet::new(
            "demo",
            vec![task("A", 1, 10, TaskStatus::NotStarted)],
        );
        let filter = ResetFilter {
            all: true,
            ..Default::default()
        };

        let outcome = reset_tasks(&mut set, &filter).unwrap();
        assert_eq!(outcome, ResetOutcome { reset: 0, already_clean: 1 });

        // Running it again still reports the task as already clean.
        let outcome = reset_tasks(&mut set, &filter).unwrap();
        assert_eq!(outcome, ResetOutcome { reset: 0, already_clean: 1 });
    }

    #[test]
    fn reset_clears_timing_fields() {
        let mut set = TaskSet::new("demo", vec![task("A", 1, 10, TaskStatus::Failed)]);
        let outcome = reset_tasks(
            &mut set,
            &ResetFilter {
                all: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(outcome.reset, 1);
        assert_eq!(set.tasks[0].status, TaskStatus::NotStarted);
        assert!(set.tasks[0].elapsed_seconds.is_none());
        assert!(set.tasks[0].last_run_at.is_none());
    }

    #[test]
    fn status_and_batch_filters_compose() {
        let mut set = TaskSet::new(
            "demo",
            vec![
                task("A", 1, 10, TaskStatus::Failed),
                task("B", 2, 10, TaskStatus::Failed),
                task("C", 1, 20, TaskStatus::Completed),
            ],
        );
        let outcome = reset_tasks(
            &mut set,
            &ResetFilter {
                status: Some(TaskStatus::Failed),
                batch: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(outcome.reset, 1);
        assert_eq!(set.tasks[0].status, TaskStatus::NotStarted);
        assert_eq!(set.tasks[1].status, TaskStatus::Failed);
        assert_eq!(set.tasks[2].status, TaskStatus::Completed);
    }

    #[test]
    fn start_from_resets_anchor_and_later_tasks_in_sorted_order() {
        let mut set = TaskSet::new(
            "demo",
            vec![
                task("A", 1, 10, TaskStatus::Completed),
                task("B", 1, 20, TaskStatus::Completed),
                task("C", 2, 10, TaskStatus::Completed),
            ],
        );
        let outcome = reset_tasks(
            &mut set,
            &ResetFilter {
                start_from: Some("B".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(outcome.reset, 2);
        assert_eq!(set.find("A").unwrap().status, TaskStatus::Completed);
        assert_eq!(set.find("B").unwrap().status, TaskStatus::NotStarted);
        assert_eq!(set.find("C").unwrap().status, TaskStatus::NotStarted);
    }

    #[test]
    fn missing_start_from_anchor_is_an_error() {
        let mut set = TaskSet::new("demo", vec![task("A", 1, 10, TaskStatus::Failed)]);
        let err = reset_tasks(
            &mut set,
            &ResetFilter {
                start_from: Some("Z".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, StateError::UnknownTask(_)));
        // Nothing was touched.
        assert_eq!(set.tasks[0].status, TaskStatus::Failed);
    }
}
