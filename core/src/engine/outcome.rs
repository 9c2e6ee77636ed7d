//! Result classification and per-run accounting.

use serde::Serialize;

use crate::runner::ExecOutcome;
use crate::task::TaskStatus;

/// What one execution amounted to, in precedence order: an interrupt beats
/// a timeout beats an exit code beats the too-fast guard.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskVerdict {
    Interrupted,
    TimedOut,
    ExitFailure { exit_code: Option<i32> },
    /// Exit 0, but the tool returned faster than any real task could have
    /// been processed.
    TooFast { elapsed: f64, threshold: u64 },
    Completed,
}

impl TaskVerdict {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskVerdict::Completed)
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            TaskVerdict::Interrupted => TaskStatus::Interrupted,
            TaskVerdict::Completed => TaskStatus::Completed,
            _ => TaskStatus::Failed,
        }
    }

    pub fn failure_reason(&self) -> Option<String> {
        match self {
            TaskVerdict::Interrupted => Some("interrupted".to_string()),
            TaskVerdict::TimedOut => Some("timeout".to_string()),
            TaskVerdict::ExitFailure { exit_code: Some(code) } => {
                Some(format!("exit code {code}"))
            }
            TaskVerdict::ExitFailure { exit_code: None } => {
                Some("killed by signal".to_string())
            }
            TaskVerdict::TooFast { elapsed, threshold } => Some(format!(
                "completed too fast ({elapsed:.1}s < {threshold}s)"
            )),
            TaskVerdict::Completed => None,
        }
    }
}

/// Classify one supervisor outcome. `min_execution_secs` of 0 disables the
/// too-fast guard.
pub fn classify(outcome: &ExecOutcome, min_execution_secs: u64) -> TaskVerdict {
    if outcome.interrupted {
        return TaskVerdict::Interrupted;
    }
    if outcome.timed_out {
        return TaskVerdict::TimedOut;
    }
    match outcome.exit_code {
        Some(0) => {
            if min_execution_secs > 0 && outcome.elapsed_seconds < min_execution_secs as f64 {
                TaskVerdict::TooFast {
                    elapsed: outcome.elapsed_seconds,
                    threshold: min_execution_secs,
                }
            } else {
                TaskVerdict::Completed
            }
        }
        code => TaskVerdict::ExitFailure { exit_code: code },
    }
}

/// One task's entry in `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task_no: String,
    pub status: TaskStatus,
    pub duration_seconds: f64,
    pub return_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub log_file: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RunStats {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub attempted: usize,
}
