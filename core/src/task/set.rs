//! Task-set loading and durable persistence.
//!
//! A task set owns its tasks exclusively and is always persisted as one
//! unit: every mutation round-trips through an atomic whole-file save
//! (write temp file in the same directory, rename over the target) so the
//! on-disk file is never observed half-written.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::StateError;

use super::model::{Task, TaskStatus};

/// A collection of tasks loaded from a `<name>.tasks.json` file.
#[derive(Debug, Clone)]
pub struct TaskSet {
    pub name: String,
    /// Default template for the set, relative to the set's directory.
    pub template: Option<String>,
    pub tasks: Vec<Task>,
    file_path: Option<PathBuf>,
    /// Top-level fields other than `tasks`/`template`, preserved on save.
    extra: Map<String, Value>,
}

impl TaskSet {
    pub fn new(name: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            name: name.into(),
            template: None,
            tasks,
            file_path: None,
            extra: Map::new(),
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn find(&self, task_no: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.task_no == task_no)
    }

    pub fn find_mut(&mut self, task_no: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.task_no == task_no)
    }
}

fn task_set_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.tasks.json"))
}

/// Scan a directory for `*.tasks.json` files and return their set names.
pub fn discover_task_sets(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.strip_suffix(".tasks.json").map(str::to_string)
        })
        .collect();
    names.sort();
    names
}

/// Load a task set from `<dir>/<name>.tasks.json`.
///
/// Project-level defaults fill in per-task tool/model when the task carries
/// none of its own; anything the typed model does not know is preserved in
/// `extra` maps for round-tripping.
pub fn load_task_set(
    dir: &Path,
    name: &str,
    default_tool: Option<&str>,
    default_model: Option<&str>,
) -> Result<TaskSet, StateError> {
    let path = task_set_file(dir, name);
    if !path.exists() {
        return Err(StateError::NotFound(path.display().to_string()));
    }

    let raw = std::fs::read_to_string(&path)?;
    let mut doc: Map<String, Value> =
        serde_json::from_str(&raw).map_err(|e| StateError::Invalid {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let tasks_value = doc.remove("tasks").ok_or_else(|| StateError::Invalid {
        path: path.display().to_string(),
        reason: "missing 'tasks' array".to_string(),
    })?;
    let mut tasks: Vec<Task> =
        serde_json::from_value(tasks_value).map_err(|e| StateError::Invalid {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    for task in &mut tasks {
        if task.cli.tool.is_none() {
            task.cli.tool = default_tool.map(str::to_string);
        }
        if task.cli.model.is_none() {
            task.cli.model = default_model.map(str::to_string);
        }
    }

    let template = doc
        .remove("template")
        .and_then(|v| v.as_str().map(str::to_string));

    Ok(TaskSet {
        name: name.to_string(),
        template,
        tasks,
        file_path: Some(path),
        extra: doc,
    })
}

/// Persist the task set back to its file (atomic write).
///
/// Writes `<file>.tmp` in the same directory and renames it over the
/// target; a crash at any point leaves either the old or the new file
/// intact, never a truncated one.
pub fn save_task_set(set: &TaskSet, dir: &Path) -> Result<(), StateError> {
    let path = match &set.file_path {
        Some(p) => p.clone(),
        None => task_set_file(dir, &set.name),
    };

    let mut doc = set.extra.clone();
    if let Some(template) = &set.template {
        doc.insert("template".to_string(), Value::String(template.clone()));
    }
    doc.insert("tasks".to_string(), serde_json::to_value(&set.tasks)?);

    let mut body = serde_json::to_string_pretty(&Value::Object(doc))?;
    body.push('\n');

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, body)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// Copy the task-set file verbatim to `runtime/backups/` with a timestamp,
/// as an independent recovery path before a run starts mutating state.
pub fn backup_task_set(dir: &Path, name: &str) -> Result<Option<PathBuf>, StateError> {
    let src = task_set_file(dir, name);
    if !src.exists() {
        return Ok(None);
    }

    let backup_dir = dir.join("runtime").join("backups");
    std::fs::create_dir_all(&backup_dir)?;

    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let dst = backup_dir.join(format!("{name}_{stamp}.tasks.json"));
    std::fs::copy(&src, &dst)?;
    Ok(Some(dst))
}

/// Aggregate status counts for banners and the status command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskSetStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub remaining: usize,
}

pub fn task_set_stats(set: &TaskSet) -> TaskSetStats {
    let total = set.tasks.len();
    let count = |s: TaskStatus| set.tasks.iter().filter(|t| t.status == s).count();
    let completed = count(TaskStatus::Completed);
    let failed = count(TaskStatus::Failed);
    let in_progress = count(TaskStatus::InProgress);

    TaskSetStats {
        total,
        completed,
        failed,
        in_progress,
        not_started: total - completed - failed - in_progress,
        remaining: total - completed,
    }
}
