//! Wave planning: a dependency-respecting execution-plan view.

use std::collections::HashSet;

use crate::task::{Task, TaskSet};

/// Group tasks into execution waves.
///
/// Each wave collects every not-yet-placed task whose dependency (if any)
/// is already placed, sorted by (batch, priority). Iteration is bounded by
/// task count + 1: if a pass places nothing, the remaining tasks have
/// unsatisfiable dependencies and are dumped into one final wave instead of
/// looping forever.
pub fn execution_plan(set: &TaskSet) -> Vec<Vec<Task>> {
    let mut tasks: Vec<Task> = set.tasks.clone();
    tasks.sort_by_key(|t| (t.batch, t.priority));

    let mut placed: HashSet<String> = HashSet::new();
    let mut remaining: Vec<Task> = tasks;
    let mut waves: Vec<Vec<Task>> = Vec::new();

    let max_iterations = remaining.len() + 1;
    for _ in 0..max_iterations {
        if remaining.is_empty() {
            break;
        }

        let (wave, rest): (Vec<Task>, Vec<Task>) = remaining.into_iter().partition(|t| {
            t.depends_on
                .as_deref()
                .map(|dep| placed.contains(dep))
                .unwrap_or(true)
        });
        remaining = rest;

        if wave.is_empty() {
            // Unresolvable dependencies: terminate with one final wave.
            remaining.sort_by(|a, b| a.task_no.cmp(&b.task_no));
            waves.push(std::mem::take(&mut remaining));
            break;
        }

        for t in &wave {
            placed.insert(t.task_no.clone());
        }
        waves.push(wave);
    }

    waves
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(no: &str, batch: i64, priority: i64, dep: Option<&str>) -> Task {
        let mut t = Task::new(no);
        t.batch = batch;
        t.priority = priority;
        t.depends_on = dep.map(str::to_string);
        t
    }

    fn wave_nos(waves: &[Vec<Task>]) -> Vec<Vec<&str>> {
        waves
            .iter()
            .map(|w| w.iter().map(|t| t.task_no.as_str()).collect())
            .collect()
    }

    #[test]
    fn scenario_independent_tasks_share_the_first_wave() {
        let set = TaskSet::new(
            "demo",
            vec![
                task("A", 1, 1, None),
                task("B", 1, 2, Some("A")),
                task("C", 2, 1, None),
            ],
        );
        let waves = execution_plan(&set);
        assert_eq!(wave_nos(&waves), vec![vec!["A", "C"], vec!["B"]]);
    }

    #[test]
    fn every_task_appears_exactly_once_and_after_its_dependency() {
        let set = TaskSet::new(
            "demo",
            vec![
                task("A", 1, 10, None),
                task("B", 1, 20, Some("A")),
                task("C", 1, 30, Some("B")),
                task("D", 2, 10, None),
                task("E", 2, 20, Some("A")),
            ],
        );
        let waves = execution_plan(&set);

        let flat: Vec<&str> = waves
            .iter()
            .flatten()
            .map(|t| t.task_no.as_str())
            .collect();
        let unique: HashSet<&&str> = flat.iter().collect();
        assert_eq!(flat.len(), 5);
        assert_eq!(unique.len(), 5);

        let wave_of = |no: &str| {
            waves
                .iter()
                .position(|w| w.iter().any(|t| t.task_no == no))
                .unwrap()
        };
        assert!(wave_of("B") > wave_of("A"));
        assert!(wave_of("C") > wave_of("B"));
        assert!(wave_of("E") > wave_of("A"));
    }

    #[test]
    fn waves_are_sorted_by_batch_then_priority() {
        let set = TaskSet::new(
            "demo",
            vec![
                task("hi", 2, 1, None),
                task("lo", 1, 5, None),
                task("mid", 1, 9, None),
            ],
        );
        let waves = execution_plan(&set);
        assert_eq!(wave_nos(&waves), vec![vec!["lo", "mid", "hi"]]);
    }

    #[test]
    fn cyclic_remainder_lands_in_one_final_wave() {
        let set = TaskSet::new(
            "demo",
            vec![
                task("A", 1, 1, None),
                task("B", 1, 2, Some("C")),
                task("C", 1, 3, Some("B")),
            ],
        );
        let waves = execution_plan(&set);
        assert_eq!(waves.len(), 2);
        assert_eq!(wave_nos(&waves)[0], vec!["A"]);
        // The stuck pair terminates the plan rather than spinning.
        assert_eq!(wave_nos(&waves)[1], vec!["B", "C"]);
    }

    #[test]
    fn empty_set_yields_no_waves() {
        let set = TaskSet::new("demo", vec![]);
        assert!(execution_plan(&set).is_empty());
    }
}
