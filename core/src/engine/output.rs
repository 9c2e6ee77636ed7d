//! Human-facing progress output for the execution loop. Everything here is
//! plain printing; structured diagnostics go through `tracing` instead.

use crate::task::{Task, TaskSetStats};

use super::outcome::RunStats;
use super::TaskReport;

pub fn show_banner(
    task_set: &str,
    tool: &str,
    model: Option<&str>,
    workspace: &str,
    run_id: &str,
    stats: &TaskSetStats,
    to_execute: usize,
) {
    println!("┌──────────────────────────────────────────────");
    println!("│ batchpilot — task set '{task_set}'");
    println!("│ tool: {tool}{}", match model {
        Some(m) => format!(" (model: {m})"),
        None => String::new(),
    });
    println!("│ workspace: {workspace}");
    println!("│ run: {run_id}");
    println!(
        "│ tasks: {} total, {} done, {} remaining — executing {}",
        stats.total, stats.completed, stats.remaining, to_execute
    );
    println!("└──────────────────────────────────────────────");
}

pub fn show_all_done() {
    println!("✓ Nothing to do — all matching tasks are completed.");
}

pub fn show_task_skip(task_no: &str) {
    println!("⏭  {task_no}: already completed, skipping");
}

pub fn show_task_start(idx: usize, total: usize, task: &Task) {
    println!();
    println!(
        "▶ [{}/{}] {} — {} (batch {}, priority {})",
        idx + 1,
        total,
        task.task_no,
        if task.task_name.is_empty() {
            "(unnamed)"
        } else {
            &task.task_name
        },
        task.batch,
        task.priority
    );
}

pub fn show_task_prompt(rel_path: &str) {
    println!("  prompt: {rel_path}");
}

pub fn show_task_cmd(cmd: &str) {
    println!("  cmd: {cmd}");
}

pub fn show_dry_run_skip(task_no: &str) {
    println!("  [dry-run] {task_no}: prompt written, execution skipped");
}

pub fn show_task_result(task_no: &str, success: bool, elapsed: f64, log: &str, tail: &str) {
    if success {
        println!("✓ {task_no} completed in {elapsed:.1}s (log: {log})");
    } else {
        println!("✗ {task_no} FAILED after {elapsed:.1}s (log: {log})");
    }
    if !tail.is_empty() {
        println!("  ── output tail ──");
        for line in tail.lines() {
            println!("  {line}");
        }
    }
}

pub fn show_warning(msg: &str) {
    eprintln!("⚠ {msg}");
}

pub fn show_tool_not_found(name: &str) {
    eprintln!("✗ Tool '{name}' not found in PATH. Is it installed?");
}

pub fn show_interrupt() {
    eprintln!("\n⚠ Interrupt received — finishing up. Press Ctrl-C again to force quit.");
}

pub fn show_force_exit() {
    eprintln!("\n✗ Force exit.");
}

pub fn show_summary(stats: &RunStats, set_stats: &TaskSetStats, total_elapsed: f64, interrupted: bool, reports: &[TaskReport]) {
    println!();
    println!("═══ Run summary ═══");
    println!(
        "  {} succeeded, {} failed, {} skipped ({} attempted) in {:.1}s",
        stats.succeeded, stats.failed, stats.skipped, stats.attempted, total_elapsed
    );
    println!(
        "  task set: {}/{} completed overall",
        set_stats.completed, set_stats.total
    );
    if interrupted {
        println!("  ⚠ run was interrupted");
    }
    let failed: Vec<&TaskReport> = reports
        .iter()
        .filter(|r| r.failure_reason.is_some())
        .collect();
    if !failed.is_empty() {
        println!("  failed tasks:");
        for r in failed {
            println!(
                "    ✗ {} — {} ({})",
                r.task_no,
                r.failure_reason.as_deref().unwrap_or(""),
                r.log_file
            );
        }
    }
}
