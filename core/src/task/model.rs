use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle state of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
    Interrupted,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not-started",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Interrupted => "interrupted",
            TaskStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not-started" => Some(TaskStatus::NotStarted),
            "in-progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "interrupted" => Some(TaskStatus::Interrupted),
            "skipped" => Some(TaskStatus::Skipped),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-task CLI tool/model override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCliOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl TaskCliOverride {
    pub fn is_empty(&self) -> bool {
        self.tool.is_none() && self.model.is_none()
    }
}

fn default_batch() -> i64 {
    1
}

fn default_priority() -> i64 {
    50
}

/// A single task within a task set.
///
/// Unknown fields from legacy task files are kept in `extra` so that a
/// load/save round trip never drops data; everything internal works on the
/// typed fields only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_no: String,

    #[serde(default)]
    pub task_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_batch")]
    pub batch: i64,

    #[serde(default = "default_priority")]
    pub priority: i64,

    #[serde(default)]
    pub status: TaskStatus,

    /// Per-task template override, relative to the task-set directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    #[serde(default, skip_serializing_if = "TaskCliOverride::is_empty")]
    pub cli: TaskCliOverride,

    /// Single predecessor this task waits for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    pub fn new(task_no: impl Into<String>) -> Self {
        Self {
            task_no: task_no.into(),
            task_name: String::new(),
            description: String::new(),
            batch: default_batch(),
            priority: default_priority(),
            status: TaskStatus::default(),
            prompt: None,
            cli: TaskCliOverride::default(),
            depends_on: None,
            elapsed_seconds: None,
            last_run_at: None,
            extra: Map::new(),
        }
    }

    /// Filesystem-safe form of the task number, used for prompt/log names.
    pub fn safe_no(&self) -> String {
        self.task_no.replace(['/', '\\'], "_")
    }
}
