//! Dependency validation: dangling references and cycles.

use std::collections::{HashMap, HashSet};

use crate::task::{Task, TaskSet};

/// Accumulated validation findings. Errors are reported, never panicked;
/// a dangling reference or a cycle must not crash the caller.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Check every `depends_on` reference resolves and that the dependency
/// graph is acyclic.
///
/// Cycle detection is a DFS with an in-progress stack distinct from the
/// fully-visited set: revisiting an in-progress node is a cycle, revisiting
/// a finished node is not.
pub fn validate_dependencies(set: &TaskSet) -> ValidationResult {
    let mut result = ValidationResult::default();
    let task_map: HashMap<&str, &Task> =
        set.tasks.iter().map(|t| (t.task_no.as_str(), t)).collect();

    for task in &set.tasks {
        if let Some(dep) = &task.depends_on {
            if !task_map.contains_key(dep.as_str()) {
                result.add_error(format!(
                    "Task '{}' depends on '{}' which doesn't exist",
                    task.task_no, dep
                ));
            }
        }
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut in_stack: HashSet<&str> = HashSet::new();

    fn dfs<'a>(
        task_no: &'a str,
        task_map: &HashMap<&'a str, &'a Task>,
        visited: &mut HashSet<&'a str>,
        in_stack: &mut HashSet<&'a str>,
        result: &mut ValidationResult,
    ) -> bool {
        if in_stack.contains(task_no) {
            return true;
        }
        if visited.contains(task_no) {
            return false;
        }
        let Some(task) = task_map.get(task_no) else {
            return false;
        };

        visited.insert(task_no);
        in_stack.insert(task_no);

        if let Some(dep) = task.depends_on.as_deref() {
            if dfs(dep, task_map, visited, in_stack, result) {
                result.add_error(format!(
                    "Dependency cycle detected involving task '{task_no}'"
                ));
                return true;
            }
        }

        in_stack.remove(task_no);
        false
    }

    for task in &set.tasks {
        if !visited.contains(task.task_no.as_str()) {
            dfs(
                task.task_no.as_str(),
                &task_map,
                &mut visited,
                &mut in_stack,
                &mut result,
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(no: &str, dep: Option<&str>) -> Task {
        let mut t = Task::new(no);
        t.depends_on = dep.map(str::to_string);
        t
    }

    #[test]
    fn acyclic_chain_has_no_errors() {
        let set = TaskSet::new(
            "demo",
            vec![task("A", None), task("B", Some("A")), task("C", Some("B"))],
        );
        let result = validate_dependencies(&set);
        assert!(result.is_valid(), "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn dangling_reference_is_reported() {
        let set = TaskSet::new("demo", vec![task("A", Some("GHOST"))]);
        let result = validate_dependencies(&set);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("GHOST"));
        assert!(result.errors[0].contains("A"));
    }

    #[test]
    fn two_task_cycle_is_reported() {
        let set = TaskSet::new("demo", vec![task("A", Some("B")), task("B", Some("A"))]);
        let result = validate_dependencies(&set);
        assert!(!result.is_valid());
        assert!(
            result
                .errors
                .iter()
                .any(|e| e.contains("cycle") && (e.contains("'A'") || e.contains("'B'"))),
            "expected a cycle error naming A or B: {:?}",
            result.errors
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let set = TaskSet::new("demo", vec![task("A", Some("A"))]);
        let result = validate_dependencies(&set);
        assert!(!result.is_valid());
    }

    #[test]
    fn diamond_revisit_of_finished_node_is_not_a_cycle() {
        // B and C both depend on A; A is visited twice but never while
        // in-progress.
        let set = TaskSet::new(
            "demo",
            vec![task("A", None), task("B", Some("A")), task("C", Some("A"))],
        );
        assert!(validate_dependencies(&set).is_valid());
    }
}
