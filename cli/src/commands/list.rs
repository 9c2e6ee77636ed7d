use std::path::Path;

use batchpilot_core::error::CliError;
use batchpilot_core::task::{discover_task_sets, load_task_set, task_set_stats};

use crate::cli::ListArgs;

use super::run::parse_status;

pub fn handle_list(dir: &Path, args: &ListArgs) -> Result<i32, CliError> {
    match &args.task_set {
        Some(name) => list_tasks(dir, name, args),
        None => list_sets(dir),
    }
}

fn list_sets(dir: &Path) -> Result<i32, CliError> {
    let names = discover_task_sets(dir);
    if names.is_empty() {
        println!("No task sets found in {}", dir.display());
        return Ok(0);
    }
    for name in names {
        match load_task_set(dir, &name, None, None) {
            Ok(set) => {
                let stats = task_set_stats(&set);
                println!(
                    "{name}: {} tasks ({} completed, {} failed, {} remaining)",
                    stats.total, stats.completed, stats.failed, stats.remaining
                );
            }
            Err(err) => println!("{name}: unreadable ({err})"),
        }
    }
    Ok(0)
}

fn list_tasks(dir: &Path, name: &str, args: &ListArgs) -> Result<i32, CliError> {
    let status_filter = args.status.as_deref().map(parse_status).transpose()?;
    let set = load_task_set(dir, name, None, None)?;

    let mut tasks: Vec<_> = set.tasks.iter().collect();
    if let Some(status) = status_filter {
        tasks.retain(|t| t.status == status);
    }
    tasks.sort_by_key(|t| (t.batch, t.priority));

    println!(
        "{:<12} {:>5} {:>8}  {:<12} {}",
        "TASK", "BATCH", "PRIORITY", "STATUS", "NAME"
    );
    for task in tasks {
        println!(
            "{:<12} {:>5} {:>8}  {:<12} {}",
            task.task_no, task.batch, task.priority, task.status, task.task_name
        );
    }
    Ok(0)
}
