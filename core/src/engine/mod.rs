//! The sequential execution loop: resolve each scheduled task to a prompt
//! and a tool invocation, supervise it, classify the result, and persist
//! task state after every transition.

mod heartbeat;
mod outcome;
pub mod output;

pub use heartbeat::{reset_terminal_title, Heartbeat};
pub use outcome::{classify, RunStats, TaskReport, TaskVerdict};

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use rand::Rng;
use tracing::{info, warn};

use crate::config::{build_command, AppConfig, ToolConfig, ToolRegistry};
use crate::error::{EngineError, StateError};
use crate::render::render_prompt;
use crate::runner::{self, CancelToken, ExecOutcome, ExecRequest};
use crate::runtime::{
    create_run_context, save_run_metadata, save_run_summary, update_latest_symlink,
};
use crate::sanitize::{output_tail, sanitize_log_file};
use crate::scheduler::{schedule_tasks, validate_dependencies, ScheduleFilter};
use crate::task::{
    backup_task_set, load_task_set, save_task_set, task_set_stats, Task, TaskSet, TaskStatus,
};

const OUTPUT_TAIL_LINES: usize = 30;
const DEFAULT_TOOL: &str = "kimi";

/// Options for one `run` invocation, mostly straight from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub project_dir: PathBuf,
    pub set_name: String,
    /// Explicit tool choice; wins over per-task overrides.
    pub tool: Option<String>,
    /// Explicit model choice; wins over per-task overrides.
    pub model: Option<String>,
    pub workspace: Option<PathBuf>,
    /// Template file overriding the task-set template.
    pub template: Option<PathBuf>,
    pub filter: ScheduleFilter,
    pub dry_run: bool,
    pub quiet: bool,
    pub no_delay: bool,
    /// Forced proxy mode; `None` defers to the tool's `needs_proxy`.
    pub proxy: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: RunStats,
    pub reports: Vec<TaskReport>,
    pub interrupted: bool,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        if self.stats.failed == 0 && !self.interrupted {
            0
        } else {
            1
        }
    }
}

pub struct Engine {
    config: AppConfig,
    registry: ToolRegistry,
    cancel: CancelToken,
}

impl Engine {
    pub fn new(config: AppConfig) -> Self {
        let registry = ToolRegistry::new(&config.tools);
        Self {
            config,
            registry,
            cancel: CancelToken::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle for signal handlers; shared with the running supervisor.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub async fn run(&self, opts: &RunOptions) -> Result<RunReport, EngineError> {
        let project_dir = opts.project_dir.as_path();

        let default_tool_name = opts
            .tool
            .clone()
            .or_else(|| self.config.defaults.tool.clone())
            .unwrap_or_else(|| DEFAULT_TOOL.to_string());
        let default_tool = self.registry.get(&default_tool_name)?.clone();
        let default_model = resolve_model(
            &default_tool,
            opts.model
                .as_deref()
                .or(self.config.defaults.model.as_deref()),
        )?;

        let mut set = load_task_set(
            project_dir,
            &opts.set_name,
            Some(&default_tool_name),
            default_model.as_deref(),
        )?;

        let validation = validate_dependencies(&set);
        for warning in &validation.warnings {
            warn!("{warning}");
        }
        if !validation.is_valid() {
            return Err(EngineError::Config(format!(
                "dependency validation failed: {}",
                validation.errors.join("; ")
            )));
        }

        if let Some(anchor) = &opts.filter.start_from {
            if set.find(anchor).is_none() {
                warn!(task_no = %anchor, "start-from task not found, scheduling all matches");
            }
        }

        let scheduled = schedule_tasks(&set, &opts.filter);
        let total = scheduled.len();
        let mut stats = RunStats::default();
        let mut reports: Vec<TaskReport> = Vec::new();

        if total == 0 {
            if !opts.quiet {
                output::show_all_done();
            }
            return Ok(RunReport {
                stats,
                reports,
                interrupted: false,
            });
        }

        if !opts.dry_run && which::which(&default_tool.name).is_err() {
            output::show_tool_not_found(&default_tool.name);
            return Err(EngineError::ToolNotFound(default_tool.name.clone()));
        }

        backup_task_set(project_dir, &opts.set_name)?;

        let workspace = opts
            .workspace
            .clone()
            .or_else(|| self.config.defaults.workspace.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| project_dir.to_path_buf());

        let filters = serde_json::json!({
            "batch": opts.filter.batch,
            "min_priority": opts.filter.min_priority,
            "status": opts.filter.status.map(|s| s.to_string()),
            "retry_failed": opts.filter.retry_failed,
            "start_from": opts.filter.start_from,
        });
        let ctx = create_run_context(
            project_dir,
            &opts.set_name,
            &default_tool.name,
            default_model.as_deref(),
            &workspace.display().to_string(),
            filters,
            set.tasks.len(),
            total,
        )?;
        save_run_metadata(&ctx)?;

        if !opts.quiet {
            output::show_banner(
                &set.name,
                &default_tool.name,
                default_model.as_deref(),
                &workspace.display().to_string(),
                &ctx.run_id,
                &task_set_stats(&set),
                total,
            );
        }

        let run_start = std::time::Instant::now();
        let mut interrupted = false;

        for (idx, planned) in scheduled.iter().enumerate() {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            let task_no = planned.task_no.clone();
            let Some(task) = set.find(&task_no).cloned() else {
                continue;
            };

            if task.status == TaskStatus::Completed {
                if !opts.quiet {
                    output::show_task_skip(&task_no);
                }
                stats.skipped += 1;
                continue;
            }

            if !opts.quiet {
                output::show_task_start(idx, total, &task);
            }

            let prompt_content =
                match self.resolve_template(project_dir, &set, &task, opts.template.as_deref())? {
                    Some(template) => render_prompt(&template, &task),
                    None => {
                        let mut body = serde_json::to_string_pretty(&task)
                            .map_err(StateError::from)?;
                        body.push('\n');
                        body
                    }
                };
            let prompt_path = ctx.prompt_path(&task.safe_no());
            std::fs::write(&prompt_path, prompt_content)?;
            if !opts.quiet {
                let rel = prompt_path.strip_prefix(project_dir).unwrap_or(&prompt_path);
                output::show_task_prompt(&rel.display().to_string());
            }

            if opts.dry_run {
                if !opts.quiet {
                    output::show_dry_run_skip(&task_no);
                }
                continue;
            }

            // Per-task tool/model overrides only apply when the command line
            // did not pin one explicitly.
            let mut tool = default_tool.clone();
            if opts.tool.is_none() {
                if let Some(task_tool) = task.cli.tool.as_deref() {
                    if task_tool != tool.name {
                        match self.registry.get(task_tool) {
                            Ok(tc) => tool = tc.clone(),
                            Err(_) => output::show_warning(&format!(
                                "Unknown tool '{task_tool}' for task {task_no}, using '{}'",
                                tool.name
                            )),
                        }
                    }
                }
            }
            let mut model = default_model.clone();
            if opts.model.is_none() && task.cli.model.is_some() {
                model = task.cli.model.clone();
            }
            if !tool.supports_model {
                model = None;
            }

            if tool.name != default_tool.name && which::which(&tool.name).is_err() {
                output::show_tool_not_found(&tool.name);
                self.record_failure(
                    &mut set,
                    project_dir,
                    &mut stats,
                    &mut reports,
                    &task,
                    format!("tool '{}' not found", tool.name),
                )?;
                continue;
            }

            let cmd = build_command(&tool, &prompt_path, model.as_deref());
            if !opts.quiet {
                output::show_task_cmd(&cmd);
            }

            if let Some(t) = set.find_mut(&task_no) {
                t.status = TaskStatus::InProgress;
            }
            save_task_set(&set, project_dir)?;

            let log_path = ctx.log_path(&task.safe_no());
            let needs_proxy = opts.proxy.unwrap_or(tool.needs_proxy);
            let min_exec = tool
                .min_execution_secs
                .unwrap_or(self.config.runner.min_execution_secs);

            let req = ExecRequest {
                command: cmd,
                cwd: workspace.clone(),
                env: runner::build_child_env(needs_proxy),
                log_path: log_path.clone(),
                max_execution_secs: self.config.runner.max_execution_secs,
                kill_grace_secs: self.config.runner.kill_grace_secs,
            };

            let heartbeat = Heartbeat::start(
                task_no.clone(),
                self.config.runner.heartbeat_interval_secs,
                opts.quiet,
            );
            let exec = runner::execute(&req, &self.cancel).await;
            heartbeat.stop();

            let exec = match exec {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(task_no = %task_no, error = %err, "task execution failed to start");
                    self.record_failure(
                        &mut set,
                        project_dir,
                        &mut stats,
                        &mut reports,
                        &task,
                        err.to_string(),
                    )?;
                    continue;
                }
            };

            let verdict = verdict_for(&exec, min_exec, &self.cancel);
            let elapsed = exec.elapsed_seconds;

            if let Some(t) = set.find_mut(&task_no) {
                t.status = verdict.status();
                t.elapsed_seconds = Some(round1(elapsed));
                t.last_run_at = Some(Local::now().format("%+").to_string());
            }
            save_task_set(&set, project_dir)?;

            if verdict == TaskVerdict::Interrupted {
                interrupted = true;
                break;
            }

            stats.attempted += 1;
            if verdict.is_success() {
                stats.succeeded += 1;
            } else {
                stats.failed += 1;
            }

            match &verdict {
                TaskVerdict::TimedOut => output::show_warning(&format!(
                    "Task {task_no} timed out after {}s — marking as FAILED",
                    self.config.runner.max_execution_secs
                )),
                TaskVerdict::TooFast { elapsed, threshold } => output::show_warning(&format!(
                    "Task {task_no} completed in {elapsed:.1}s (< {threshold}s minimum) — \
                     marking as FAILED. The tool likely did not process the task."
                )),
                _ => {}
            }

            let (clean_path, clean_text) = sanitize_log_file(&log_path);
            let tail = output_tail(&clean_text, OUTPUT_TAIL_LINES);
            if !opts.quiet {
                let shown = clean_path.as_deref().unwrap_or(&log_path);
                let rel = shown.strip_prefix(project_dir).unwrap_or(shown);
                output::show_task_result(
                    &task_no,
                    verdict.is_success(),
                    elapsed,
                    &rel.display().to_string(),
                    &tail,
                );
            }

            reports.push(TaskReport {
                task_no: task_no.clone(),
                status: verdict.status(),
                duration_seconds: round1(elapsed),
                return_code: exec.exit_code,
                failure_reason: verdict.failure_reason(),
                log_file: format!("logs/{}.log", task.safe_no()),
            });

            if verdict.is_success() {
                if let Some(next) = scheduled.get(idx + 1) {
                    self.inter_task_delay(opts, &next.task_no).await;
                }
            }
        }

        reset_terminal_title();

        if self.cancel.is_cancelled() {
            interrupted = true;
        }
        let total_elapsed = run_start.elapsed().as_secs_f64();

        save_run_summary(&ctx, &stats, &reports, stats.failed, total_elapsed)?;
        update_latest_symlink(project_dir, &ctx.run_dir);

        if !opts.quiet {
            output::show_summary(
                &stats,
                &task_set_stats(&set),
                total_elapsed,
                interrupted,
                &reports,
            );
        }
        info!(
            run_id = %ctx.run_id,
            succeeded = stats.succeeded,
            failed = stats.failed,
            skipped = stats.skipped,
            interrupted,
            "run finished"
        );

        Ok(RunReport {
            stats,
            reports,
            interrupted,
        })
    }

    /// Template lookup order: per-task override, command-line override,
    /// task-set default, project default. A missing candidate warns and
    /// falls through; no template at all means the raw task JSON becomes
    /// the prompt.
    fn resolve_template(
        &self,
        project_dir: &Path,
        set: &TaskSet,
        task: &Task,
        override_path: Option<&Path>,
    ) -> Result<Option<String>, EngineError> {
        if let Some(rel) = &task.prompt {
            let path = project_dir.join(rel);
            if path.exists() {
                return Ok(Some(std::fs::read_to_string(path)?));
            }
            output::show_warning(&format!(
                "Template for task {} not found: {}",
                task.task_no,
                path.display()
            ));
        }
        if let Some(path) = override_path {
            if path.exists() {
                return Ok(Some(std::fs::read_to_string(path)?));
            }
            output::show_warning(&format!("Template not found: {}", path.display()));
        }
        if let Some(rel) = &set.template {
            let path = project_dir.join(rel);
            if path.exists() {
                return Ok(Some(std::fs::read_to_string(path)?));
            }
            output::show_warning(&format!(
                "Task-set template not found: {}",
                path.display()
            ));
        }
        let default = project_dir.join("templates").join("__init__.md");
        if default.exists() {
            return Ok(Some(std::fs::read_to_string(default)?));
        }
        Ok(None)
    }

    fn record_failure(
        &self,
        set: &mut TaskSet,
        project_dir: &Path,
        stats: &mut RunStats,
        reports: &mut Vec<TaskReport>,
        task: &Task,
        reason: String,
    ) -> Result<(), EngineError> {
        if let Some(t) = set.find_mut(&task.task_no) {
            t.status = TaskStatus::Failed;
        }
        save_task_set(set, project_dir)?;
        stats.failed += 1;
        stats.attempted += 1;
        reports.push(TaskReport {
            task_no: task.task_no.clone(),
            status: TaskStatus::Failed,
            duration_seconds: 0.0,
            return_code: None,
            failure_reason: Some(reason),
            log_file: format!("logs/{}.log", task.safe_no()),
        });
        Ok(())
    }

    /// Random pause between successful tasks so the runs don't hammer the
    /// backing services. Counts down in 1 s steps and aborts within a
    /// second of cancellation.
    async fn inter_task_delay(&self, opts: &RunOptions, next_task_no: &str) {
        if opts.no_delay || self.cancel.is_cancelled() {
            return;
        }
        let (lo, hi) = (
            self.config.runner.delay_min_secs,
            self.config.runner.delay_max_secs,
        );
        if lo == 0 && hi == 0 {
            return;
        }
        let delay = rand::thread_rng().gen_range(lo..=hi.max(lo));

        for remaining in (1..=delay).rev() {
            if self.cancel.is_cancelled() {
                if !opts.quiet {
                    println!("\r  ⏳ Delay interrupted.{:50}", "");
                }
                return;
            }
            if !opts.quiet {
                print!("\r  ⏳ Waiting {remaining}s before next: {next_task_no} (rate-limit cushion)...");
                let _ = std::io::stdout().flush();
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        if !opts.quiet {
            println!("\r  ⏳ Delay complete, resuming.{:40}", "");
        }
    }
}

fn resolve_model(
    tool: &ToolConfig,
    requested: Option<&str>,
) -> Result<Option<String>, EngineError> {
    if !tool.supports_model {
        if let Some(model) = requested {
            warn!(tool = %tool.name, model, "tool does not support model selection, ignoring");
        }
        return Ok(None);
    }
    match requested {
        Some(model) => {
            if !tool.models.is_empty() && !tool.models.iter().any(|m| m == model) {
                return Err(EngineError::UnknownModel {
                    tool: tool.name.clone(),
                    model: model.to_string(),
                    available: tool.models.join(", "),
                });
            }
            Ok(Some(model.to_string()))
        }
        None => Ok(tool.default_model.clone()),
    }
}

/// An interrupt observed anywhere during execution wins. The signal handler
/// may kill the child directly, in which case the child's EOF can reach the
/// supervisor before its poll loop sees the token; the token itself is the
/// source of truth here, not the supervisor's snapshot.
fn verdict_for(exec: &ExecOutcome, min_execution_secs: u64, cancel: &CancelToken) -> TaskVerdict {
    if exec.interrupted || cancel.is_cancelled() {
        return TaskVerdict::Interrupted;
    }
    classify(exec, min_execution_secs)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_with_models() -> ToolConfig {
        ToolConfig {
            name: "agent".to_string(),
            cmd_template: "agent {model} {task_file}".to_string(),
            needs_proxy: false,
            supports_model: true,
            default_model: Some("m-default".to_string()),
            models: vec!["m-default".to_string(), "m-big".to_string()],
            min_execution_secs: None,
        }
    }

    #[test]
    fn model_resolution_validates_against_the_tool() {
        let tool = tool_with_models();
        assert_eq!(
            resolve_model(&tool, None).unwrap().as_deref(),
            Some("m-default")
        );
        assert_eq!(
            resolve_model(&tool, Some("m-big")).unwrap().as_deref(),
            Some("m-big")
        );
        assert!(matches!(
            resolve_model(&tool, Some("bogus")),
            Err(EngineError::UnknownModel { .. })
        ));
    }

    #[test]
    fn model_is_dropped_for_tools_without_model_support() {
        let mut tool = tool_with_models();
        tool.supports_model = false;
        assert_eq!(resolve_model(&tool, Some("m-big")).unwrap(), None);
    }

    #[test]
    fn cancel_token_set_during_execution_classifies_as_interrupted() {
        // The child died to the handler's direct kill and EOF'd before the
        // supervisor's next tick: its outcome says "killed by signal", but
        // the set token must still win.
        let exec = ExecOutcome {
            exit_code: None,
            elapsed_seconds: 0.3,
            timed_out: false,
            interrupted: false,
        };

        let cancel = CancelToken::new();
        assert_eq!(
            verdict_for(&exec, 10, &cancel),
            TaskVerdict::ExitFailure { exit_code: None }
        );

        cancel.escalate();
        let verdict = verdict_for(&exec, 10, &cancel);
        assert_eq!(verdict, TaskVerdict::Interrupted);
        assert_eq!(verdict.status(), crate::task::TaskStatus::Interrupted);
    }

    #[test]
    fn engine_builds_registry_from_config_overrides() {
        let mut config = AppConfig::default();
        config.tools.insert(
            "mytool".to_string(),
            crate::config::ToolConfigOverride {
                cmd_template: Some("mytool {task_file}".to_string()),
                ..Default::default()
            },
        );
        let engine = Engine::new(config);
        assert!(engine.registry().get("mytool").is_ok());
        assert!(engine.registry().get("kimi").is_ok());
    }
}
