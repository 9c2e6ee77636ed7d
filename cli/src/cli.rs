use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "batchpilot",
    version,
    about = "Batch runner for AI coding-assistant CLIs"
)]
pub struct Args {
    /// Project directory containing `<name>.tasks.json` files.
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute tasks from a task set
    Run(RunArgs),
    /// Render and write prompts without executing anything
    DryRun(RunArgs),
    /// Reset task status back to not-started
    Reset(ResetArgs),
    /// List task sets, or the tasks within one
    List(ListArgs),
    /// Show status counts for task sets
    Status(StatusArgs),
    /// Show the dependency-respecting wave plan for a task set
    Plan(SetArg),
    /// Validate task dependencies (dangling references, cycles)
    Validate(SetArg),
}

#[derive(ClapArgs, Debug)]
pub struct RunArgs {
    /// Task set name (without .tasks.json)
    pub task_set: String,

    /// CLI tool to use; wins over per-task overrides
    #[arg(long)]
    pub tool: Option<String>,

    /// Model name; wins over per-task overrides
    #[arg(long)]
    pub model: Option<String>,

    /// Template file overriding the task-set template
    #[arg(long, value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Force proxy environment variables on
    #[arg(long, conflicts_with = "no_proxy")]
    pub proxy: bool,

    /// Force proxy environment variables off
    #[arg(long)]
    pub no_proxy: bool,

    /// Only run tasks in batch N
    #[arg(long, value_name = "N")]
    pub batch: Option<i64>,

    /// Only run tasks with priority <= N
    #[arg(long, value_name = "N")]
    pub min_priority: Option<i64>,

    /// Start from a specific task number (e.g. 'F-3')
    #[arg(long, value_name = "TASK_NO")]
    pub start: Option<String>,

    /// Only re-run failed or interrupted tasks
    #[arg(long)]
    pub retry_failed: bool,

    /// Working directory for the spawned tools
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Minimal output (no banner, no per-task chatter)
    #[arg(long, short)]
    pub quiet: bool,

    /// Skip the randomized inter-task delay
    #[arg(long)]
    pub no_delay: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ResetArgs {
    /// Task set name (without .tasks.json)
    pub task_set: String,

    /// Reset every task
    #[arg(long)]
    pub all: bool,

    /// Reset only tasks with this status (e.g. failed)
    #[arg(long, value_name = "STATUS")]
    pub status: Option<String>,

    /// Reset only tasks in batch N
    #[arg(long, value_name = "N")]
    pub batch: Option<i64>,

    /// Reset this task and everything after it in (batch, priority) order
    #[arg(long, value_name = "TASK_NO")]
    pub start: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct ListArgs {
    /// Task set name; omit to list all sets in the directory
    pub task_set: Option<String>,

    /// Filter listed tasks by status
    #[arg(long, value_name = "STATUS")]
    pub status: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct StatusArgs {
    /// Task set name; omit for all sets
    pub task_set: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct SetArg {
    /// Task set name (without .tasks.json)
    pub task_set: String,
}
