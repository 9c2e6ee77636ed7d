//! Task scheduling: which tasks run, in what order.

mod deps;
mod plan;

pub use deps::{validate_dependencies, ValidationResult};
pub use plan::execution_plan;

use crate::task::{Task, TaskSet, TaskStatus};

/// Composable schedule filters, applied after the (batch, priority) sort in
/// the order the fields are declared here.
#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    /// Keep only tasks in this exact batch.
    pub batch: Option<i64>,
    /// Keep only tasks with priority <= this threshold.
    pub min_priority: Option<i64>,
    /// Keep only tasks with this exact status.
    pub status: Option<TaskStatus>,
    /// Keep only failed or interrupted tasks.
    pub retry_failed: bool,
    /// Keep this task and everything after it in sorted order.
    ///
    /// Contract: if the anchor is not present in the filtered list, the
    /// list is returned unchanged. Callers that accept the anchor from user
    /// input should warn when it resolves to nothing, since a typo here
    /// silently schedules everything.
    pub start_from: Option<String>,
}

/// Sort and filter tasks for execution.
///
/// Sorting is a stable sort by `(batch ASC, priority ASC)`; ties keep the
/// original file order. Filters compose conjunctively.
pub fn schedule_tasks(set: &TaskSet, filter: &ScheduleFilter) -> Vec<Task> {
    let mut tasks: Vec<Task> = set.tasks.clone();
    tasks.sort_by_key(|t| (t.batch, t.priority));

    if let Some(batch) = filter.batch {
        tasks.retain(|t| t.batch == batch);
    }
    if let Some(min_priority) = filter.min_priority {
        tasks.retain(|t| t.priority <= min_priority);
    }
    if let Some(status) = filter.status {
        tasks.retain(|t| t.status == status);
    }
    if filter.retry_failed {
        tasks.retain(|t| matches!(t.status, TaskStatus::Failed | TaskStatus::Interrupted));
    }
    if let Some(anchor) = &filter.start_from {
        if let Some(pos) = tasks.iter().position(|t| t.task_no == *anchor) {
            tasks.drain(..pos);
        }
        // Anchor absent: return the filtered set unchanged.
    }

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn task(no: &str, batch: i64, priority: i64) -> Task {
        let mut t = Task::new(no);
        t.batch = batch;
        t.priority = priority;
        t
    }

    fn nos(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.task_no.as_str()).collect()
    }

    #[test]
    fn sorts_by_batch_then_priority() {
        let set = TaskSet::new(
            "demo",
            vec![
                task("W", 1, 20),
                task("X", 1, 10),
                task("Y", 2, 5),
                task("Z", 1, 15),
            ],
        );
        let scheduled = schedule_tasks(&set, &ScheduleFilter::default());
        assert_eq!(nos(&scheduled), vec!["X", "Z", "W", "Y"]);
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let set = TaskSet::new(
            "demo",
            vec![task("first", 1, 10), task("second", 1, 10), task("third", 1, 10)],
        );
        let scheduled = schedule_tasks(&set, &ScheduleFilter::default());
        assert_eq!(nos(&scheduled), vec!["first", "second", "third"]);
    }

    #[test]
    fn filters_compose_conjunctively() {
        let set = TaskSet::new(
            "demo",
            vec![
                task("A", 1, 10),
                task("B", 1, 30),
                task("C", 2, 10),
                task("D", 1, 15),
            ],
        );
        let scheduled = schedule_tasks(
            &set,
            &ScheduleFilter {
                batch: Some(1),
                min_priority: Some(15),
                ..Default::default()
            },
        );
        assert_eq!(nos(&scheduled), vec!["A", "D"]);
    }

    #[test]
    fn retry_failed_keeps_failed_and_interrupted() {
        let mut tasks = vec![task("A", 1, 10), task("B", 1, 20), task("C", 1, 30)];
        tasks[0].status = TaskStatus::Failed;
        tasks[1].status = TaskStatus::Completed;
        tasks[2].status = TaskStatus::Interrupted;
        let set = TaskSet::new("demo", tasks);

        let scheduled = schedule_tasks(
            &set,
            &ScheduleFilter {
                retry_failed: true,
                ..Default::default()
            },
        );
        assert_eq!(nos(&scheduled), vec!["A", "C"]);
    }

    #[test]
    fn start_from_keeps_anchor_and_rest() {
        let set = TaskSet::new(
            "demo",
            vec![task("A", 1, 10), task("B", 1, 20), task("C", 2, 10)],
        );
        let scheduled = schedule_tasks(
            &set,
            &ScheduleFilter {
                start_from: Some("B".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(nos(&scheduled), vec!["B", "C"]);
    }

    #[test]
    fn start_from_missing_anchor_returns_unchanged() {
        let set = TaskSet::new("demo", vec![task("A", 1, 10), task("B", 1, 20)]);
        let scheduled = schedule_tasks(
            &set,
            &ScheduleFilter {
                start_from: Some("NOPE".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(nos(&scheduled), vec!["A", "B"]);
    }

    #[test]
    fn scenario_linear_order_with_dependency() {
        // A (1,1), B (1,2, dep A), C (2,1): the linear schedule ignores
        // dependencies and yields pure (batch, priority) order.
        let mut a = task("A", 1, 1);
        let mut b = task("B", 1, 2);
        let c = task("C", 2, 1);
        a.depends_on = None;
        b.depends_on = Some("A".to_string());
        let set = TaskSet::new("demo", vec![a, b, c]);

        let scheduled = schedule_tasks(&set, &ScheduleFilter::default());
        assert_eq!(nos(&scheduled), vec!["A", "B", "C"]);
    }
}
