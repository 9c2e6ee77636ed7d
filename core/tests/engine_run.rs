//! End-to-end engine tests against a throwaway project directory, with the
//! CLI tool stubbed by `sh` command templates.

use std::path::Path;

use batchpilot_core::config::{AppConfig, ToolConfigOverride};
use batchpilot_core::engine::{Engine, RunOptions};
use batchpilot_core::task::{load_task_set, TaskStatus};

fn test_config(cmd_template: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.defaults.tool = Some("sh".to_string());
    config.runner.min_execution_secs = 0;
    config.runner.delay_min_secs = 0;
    config.runner.delay_max_secs = 0;
    config.runner.max_execution_secs = 60;
    config.tools.insert(
        "sh".to_string(),
        ToolConfigOverride {
            cmd_template: Some(cmd_template.to_string()),
            needs_proxy: Some(false),
            ..Default::default()
        },
    );
    config
}

fn write_task_set(dir: &Path, body: &str) {
    std::fs::write(dir.join("demo.tasks.json"), body).unwrap();
}

fn run_options(dir: &Path) -> RunOptions {
    RunOptions {
        project_dir: dir.to_path_buf(),
        set_name: "demo".to_string(),
        quiet: true,
        no_delay: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn completes_tasks_and_persists_status() {
    let dir = tempfile::tempdir().unwrap();
    write_task_set(
        dir.path(),
        r#"{"tasks": [
            {"task_no": "A", "batch": 1, "priority": 10},
            {"task_no": "B", "batch": 1, "priority": 20}
        ]}"#,
    );

    let engine = Engine::new(test_config("cat {task_file} > /dev/null"));
    let report = engine.run(&run_options(dir.path())).await.unwrap();

    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(report.stats.failed, 0);
    assert!(!report.interrupted);
    assert_eq!(report.exit_code(), 0);

    let set = load_task_set(dir.path(), "demo", None, None).unwrap();
    for task in &set.tasks {
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.elapsed_seconds.is_some());
        assert!(task.last_run_at.is_some());
    }
}

#[tokio::test]
async fn failed_task_is_recorded_and_run_is_partial() {
    let dir = tempfile::tempdir().unwrap();
    write_task_set(
        dir.path(),
        r#"{"tasks": [
            {"task_no": "good", "priority": 10},
            {"task_no": "bad", "priority": 20, "cli": {"tool": "false"}}
        ]}"#,
    );

    let mut config = test_config("true # {task_file}");
    // Registered under a name that exists in PATH so the availability
    // check passes; the template itself is what fails.
    config.tools.insert(
        "false".to_string(),
        ToolConfigOverride {
            cmd_template: Some("exit 3 # {task_file}".to_string()),
            needs_proxy: Some(false),
            ..Default::default()
        },
    );

    let engine = Engine::new(config);
    let report = engine.run(&run_options(dir.path())).await.unwrap();

    assert_eq!(report.stats.succeeded, 1);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.exit_code(), 1);

    let bad = report
        .reports
        .iter()
        .find(|r| r.task_no == "bad")
        .expect("report for failed task");
    assert_eq!(bad.return_code, Some(3));
    assert_eq!(bad.failure_reason.as_deref(), Some("exit code 3"));

    let set = load_task_set(dir.path(), "demo", None, None).unwrap();
    assert_eq!(set.find("good").unwrap().status, TaskStatus::Completed);
    assert_eq!(set.find("bad").unwrap().status, TaskStatus::Failed);
}

#[tokio::test]
async fn too_fast_guard_fails_instant_exits() {
    let dir = tempfile::tempdir().unwrap();
    write_task_set(dir.path(), r#"{"tasks": [{"task_no": "A"}]}"#);

    let mut config = test_config("true # {task_file}");
    config.runner.min_execution_secs = 10;

    let engine = Engine::new(config);
    let report = engine.run(&run_options(dir.path())).await.unwrap();

    assert_eq!(report.stats.failed, 1);
    let reason = report.reports[0].failure_reason.as_deref().unwrap();
    assert!(reason.starts_with("completed too fast"), "reason: {reason}");
}

#[tokio::test]
async fn dry_run_writes_prompts_without_executing() {
    let dir = tempfile::tempdir().unwrap();
    write_task_set(
        dir.path(),
        r#"{"tasks": [{"task_no": "A", "task_name": "inspect"}]}"#,
    );

    let engine = Engine::new(test_config("exit 99 # {task_file}"));
    let mut opts = run_options(dir.path());
    opts.dry_run = true;
    let report = engine.run(&opts).await.unwrap();

    assert_eq!(report.stats.attempted, 0);
    assert_eq!(report.exit_code(), 0);

    // The prompt file exists under runtime/runs/<id>__demo/prompts.
    let runs_dir = dir.path().join("runtime").join("runs");
    let run_dir = std::fs::read_dir(&runs_dir).unwrap().next().unwrap().unwrap();
    let prompt = run_dir.path().join("prompts").join("A_task.md");
    assert!(prompt.is_file());

    // No execution means no status change.
    let set = load_task_set(dir.path(), "demo", None, None).unwrap();
    assert_eq!(set.tasks[0].status, TaskStatus::NotStarted);
}

#[tokio::test]
async fn completed_tasks_are_skipped_and_run_artifacts_written() {
    let dir = tempfile::tempdir().unwrap();
    write_task_set(
        dir.path(),
        r#"{"tasks": [
            {"task_no": "done", "status": "completed"},
            {"task_no": "todo"}
        ]}"#,
    );

    let engine = Engine::new(test_config("true # {task_file}"));
    let report = engine.run(&run_options(dir.path())).await.unwrap();

    assert_eq!(report.stats.skipped, 1);
    assert_eq!(report.stats.succeeded, 1);
    assert_eq!(report.stats.attempted, 1);

    let runs_dir = dir.path().join("runtime").join("runs");
    let run_dir = std::fs::read_dir(&runs_dir).unwrap().next().unwrap().unwrap();
    assert!(run_dir.path().join("run.json").is_file());

    let summary: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(run_dir.path().join("summary.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(summary["status"], "completed");
    assert_eq!(summary["results"]["succeeded"], 1);

    // A pre-run backup of the task set exists.
    let backups = dir.path().join("runtime").join("backups");
    assert!(std::fs::read_dir(backups).unwrap().next().is_some());
}

#[tokio::test]
async fn template_renders_the_prompt() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("templates")).unwrap();
    std::fs::write(
        dir.path().join("templates").join("__init__.md"),
        "Do task {{task_no}} now.\n",
    )
    .unwrap();
    write_task_set(dir.path(), r#"{"tasks": [{"task_no": "T9"}]}"#);

    let engine = Engine::new(test_config("true # {task_file}"));
    let mut opts = run_options(dir.path());
    opts.dry_run = true;
    engine.run(&opts).await.unwrap();

    let runs_dir = dir.path().join("runtime").join("runs");
    let run_dir = std::fs::read_dir(&runs_dir).unwrap().next().unwrap().unwrap();
    let prompt =
        std::fs::read_to_string(run_dir.path().join("prompts").join("T9_task.md")).unwrap();
    assert_eq!(prompt, "Do task T9 now.\n");
}
