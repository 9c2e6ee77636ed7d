use std::path::Path;

use batchpilot_core::error::CliError;
use batchpilot_core::runtime::list_runs;
use batchpilot_core::task::{
    discover_task_sets, load_task_set, task_set_stats, TaskSetStats, TaskStatus,
};

use crate::cli::StatusArgs;

pub fn handle_status(dir: &Path, args: &StatusArgs) -> Result<i32, CliError> {
    match &args.task_set {
        Some(name) => {
            let set = load_task_set(dir, name, None, None)?;
            print_stats(name, &task_set_stats(&set));
            let failed: Vec<&str> = set
                .tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Failed)
                .map(|t| t.task_no.as_str())
                .collect();
            if !failed.is_empty() {
                println!("  failed: {}", failed.join(", "));
            }
        }
        None => {
            let names = discover_task_sets(dir);
            if names.is_empty() {
                println!("No task sets found in {}", dir.display());
                return Ok(0);
            }
            for name in names {
                if let Ok(set) = load_task_set(dir, &name, None, None) {
                    print_stats(&name, &task_set_stats(&set));
                }
            }
        }
    }

    print_run_history(dir, 5);
    Ok(0)
}

fn print_run_history(dir: &Path, limit: usize) {
    let runs = list_runs(dir);
    if runs.is_empty() {
        return;
    }

    println!("\nRecent runs:");
    for run in runs.iter().take(limit) {
        let id = run["run_id"].as_str().unwrap_or("?");
        let set = run["task_set_name"].as_str().unwrap_or("?");
        let status = run["summary"]["status"].as_str().unwrap_or("in progress");
        match run["summary"]["duration_seconds"].as_f64() {
            Some(secs) => println!("  {id}  {set}  {status} ({secs:.1}s)"),
            None => println!("  {id}  {set}  {status}"),
        }
    }
}

fn print_stats(name: &str, stats: &TaskSetStats) {
    let pct = if stats.total > 0 {
        stats.completed * 100 / stats.total
    } else {
        0
    };
    println!(
        "{name}: {}/{} completed ({pct}%) — {} failed, {} in progress, {} not started",
        stats.completed, stats.total, stats.failed, stats.in_progress, stats.not_started
    );
}
