//! Per-run runtime directories: prompts, raw logs, metadata, summaries, and
//! the `latest` convenience symlink.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::error::StateError;

pub const RUN_ID_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Context for a single execution run. All artifact paths hang off
/// `run_dir`.
#[derive(Debug, Clone, Serialize)]
pub struct RunContext {
    pub run_id: String,
    #[serde(skip)]
    pub run_dir: PathBuf,
    pub task_set_name: String,
    pub started_at: String,
    pub tool: String,
    pub model: Option<String>,
    pub workspace: String,
    pub filters: serde_json::Value,
    pub total_tasks: usize,
    pub tasks_to_execute: usize,
}

impl RunContext {
    pub fn prompts_dir(&self) -> PathBuf {
        self.run_dir.join("prompts")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.run_dir.join("logs")
    }

    pub fn prompt_path(&self, safe_no: &str) -> PathBuf {
        self.prompts_dir().join(format!("{safe_no}_task.md"))
    }

    pub fn log_path(&self, safe_no: &str) -> PathBuf {
        self.logs_dir().join(format!("{safe_no}.log"))
    }
}

/// Create the timestamped run directory tree and its context.
#[allow(clippy::too_many_arguments)]
pub fn create_run_context(
    project_dir: &Path,
    task_set_name: &str,
    tool: &str,
    model: Option<&str>,
    workspace: &str,
    filters: serde_json::Value,
    total_tasks: usize,
    tasks_to_execute: usize,
) -> Result<RunContext, StateError> {
    let now = Local::now();
    let run_id = now.format(RUN_ID_FORMAT).to_string();
    let run_dir = project_dir
        .join("runtime")
        .join("runs")
        .join(format!("{run_id}__{task_set_name}"));

    fs::create_dir_all(run_dir.join("prompts"))?;
    fs::create_dir_all(run_dir.join("logs"))?;

    Ok(RunContext {
        run_id,
        run_dir,
        task_set_name: task_set_name.to_string(),
        started_at: now.format("%+").to_string(),
        tool: tool.to_string(),
        model: model.map(str::to_string),
        workspace: workspace.to_string(),
        filters,
        total_tasks,
        tasks_to_execute,
    })
}

/// Write `run.json` with the run metadata.
pub fn save_run_metadata(ctx: &RunContext) -> Result<(), StateError> {
    let mut text = serde_json::to_string_pretty(ctx)?;
    text.push('\n');
    fs::write(ctx.run_dir.join("run.json"), text)?;
    Ok(())
}

/// Write `summary.json` when the run ends. `status` is `completed` when
/// nothing failed, `partial` otherwise.
pub fn save_run_summary<R, T>(
    ctx: &RunContext,
    results: &R,
    tasks: &[T],
    failed: usize,
    duration_seconds: f64,
) -> Result<(), StateError>
where
    R: Serialize,
    T: Serialize,
{
    let data = json!({
        "run_id": ctx.run_id,
        "finished_at": Local::now().format("%+").to_string(),
        "duration_seconds": (duration_seconds * 10.0).round() / 10.0,
        "status": if failed == 0 { "completed" } else { "partial" },
        "results": results,
        "tasks": tasks,
    });
    let mut text = serde_json::to_string_pretty(&data)?;
    text.push('\n');
    fs::write(ctx.run_dir.join("summary.json"), text)?;
    Ok(())
}

/// Point `runtime/latest` at the given run directory. Failure to create the
/// symlink is tolerated; the artifact is a convenience only.
pub fn update_latest_symlink(project_dir: &Path, run_dir: &Path) {
    let latest = project_dir.join("runtime").join("latest");
    if latest.symlink_metadata().is_ok() {
        let _ = fs::remove_file(&latest);
    }

    let target = run_dir
        .strip_prefix(project_dir.join("runtime"))
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| run_dir.to_path_buf());

    #[cfg(unix)]
    if let Err(err) = std::os::unix::fs::symlink(&target, &latest) {
        debug!(error = %err, "could not update latest symlink");
    }
    #[cfg(not(unix))]
    let _ = target;
}

/// All recorded runs, newest first, each `run.json` augmented with its
/// `summary.json` when present. Unreadable entries are skipped.
pub fn list_runs(project_dir: &Path) -> Vec<serde_json::Value> {
    let runs_dir = project_dir.join("runtime").join("runs");
    let Ok(entries) = fs::read_dir(&runs_dir) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs.reverse();

    let mut results = Vec::new();
    for dir in dirs {
        let Ok(raw) = fs::read_to_string(dir.join("run.json")) else {
            continue;
        };
        let Ok(mut data) = serde_json::from_str::<serde_json::Value>(&raw) else {
            continue;
        };
        if let Ok(raw) = fs::read_to_string(dir.join("summary.json")) {
            if let Ok(summary) = serde_json::from_str::<serde_json::Value>(&raw) {
                data["summary"] = summary;
            }
        }
        results.push(data);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ctx(project_dir: &Path) -> RunContext {
        create_run_context(
            project_dir,
            "demo",
            "kimi",
            None,
            ".",
            json!({}),
            3,
            2,
        )
        .unwrap()
    }

    #[test]
    fn run_context_creates_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_ctx(dir.path());

        assert!(ctx.prompts_dir().is_dir());
        assert!(ctx.logs_dir().is_dir());
        assert!(ctx
            .run_dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("__demo"));
        assert_eq!(
            ctx.prompt_path("T1"),
            ctx.prompts_dir().join("T1_task.md")
        );
    }

    #[test]
    fn metadata_and_summary_round_trip_through_list_runs() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_ctx(dir.path());
        save_run_metadata(&ctx).unwrap();

        let reports: Vec<serde_json::Value> = vec![json!({"task_no": "T1"})];
        save_run_summary(&ctx, &json!({"completed": 1, "failed": 1}), &reports, 1, 12.34)
            .unwrap();

        let runs = list_runs(dir.path());
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0]["task_set_name"], "demo");
        assert_eq!(runs[0]["summary"]["status"], "partial");
        assert_eq!(runs[0]["summary"]["duration_seconds"], 12.3);
    }

    #[cfg(unix)]
    #[test]
    fn latest_symlink_points_at_the_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_ctx(dir.path());
        update_latest_symlink(dir.path(), &ctx.run_dir);

        let latest = dir.path().join("runtime").join("latest");
        assert!(latest.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(
            fs::canonicalize(&latest).unwrap(),
            fs::canonicalize(&ctx.run_dir).unwrap()
        );

        // Updating again replaces the link instead of failing.
        update_latest_symlink(dir.path(), &ctx.run_dir);
        assert!(latest.symlink_metadata().is_ok());
    }
}
