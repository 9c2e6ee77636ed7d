use std::path::Path;
use std::time::Duration;

use batchpilot_core::config::AppConfig;
use batchpilot_core::engine::{output, Engine, RunOptions};
use batchpilot_core::error::CliError;
use batchpilot_core::runner::{kill_group, terminate_group, CancelTier, CancelToken};
use batchpilot_core::scheduler::ScheduleFilter;
use batchpilot_core::task::TaskStatus;

use crate::cli::RunArgs;

pub async fn handle_run(
    dir: &Path,
    args: &RunArgs,
    dry_run: bool,
    config: AppConfig,
) -> Result<i32, CliError> {
    let kill_grace = Duration::from_secs(config.runner.kill_grace_secs);
    let engine = Engine::new(config);
    if !dry_run {
        install_signal_handler(engine.cancel_token(), kill_grace);
    }

    let opts = RunOptions {
        project_dir: dir.to_path_buf(),
        set_name: args.task_set.clone(),
        tool: args.tool.clone(),
        model: args.model.clone(),
        workspace: args.work_dir.clone(),
        template: args.template.clone(),
        filter: ScheduleFilter {
            batch: args.batch,
            min_priority: args.min_priority,
            status: None,
            retry_failed: args.retry_failed,
            start_from: args.start.clone(),
        },
        dry_run,
        quiet: args.quiet,
        no_delay: args.no_delay,
        proxy: if args.proxy {
            Some(true)
        } else if args.no_proxy {
            Some(false)
        } else {
            None
        },
    };

    let report = engine.run(&opts).await?;
    Ok(report.exit_code())
}

/// First Ctrl-C asks the engine to stop after the current task and nudges
/// the active child with the graceful kill sequence; the second force-kills
/// and exits 130 immediately.
fn install_signal_handler(cancel: CancelToken, kill_grace: Duration) {
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            match cancel.escalate() {
                CancelTier::Graceful => {
                    output::show_interrupt();
                    if let Some(pgid) = cancel.active_group() {
                        tokio::spawn(terminate_group(pgid, kill_grace));
                    }
                }
                _ => {
                    output::show_force_exit();
                    if let Some(pgid) = cancel.active_group() {
                        kill_group(pgid);
                    }
                    std::process::exit(130);
                }
            }
        }
    });
}

pub fn parse_status(raw: &str) -> Result<TaskStatus, CliError> {
    TaskStatus::parse(raw).ok_or_else(|| {
        CliError::Config(format!(
            "unknown status '{raw}' (expected one of: not-started, in-progress, completed, \
             failed, interrupted, skipped)"
        ))
    })
}
