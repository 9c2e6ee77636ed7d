use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Per-tool overrides merged on top of the built-in registry.
    #[serde(default)]
    pub tools: BTreeMap<String, ToolConfigOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "batchpilot_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Hard wall-clock ceiling for a single task execution.
    #[serde(default = "default_max_execution_secs")]
    pub max_execution_secs: u64,

    /// Exit code 0 below this elapsed time is still treated as a failure:
    /// an AI CLI that returns within a few seconds almost certainly did not
    /// process the task. 0 disables the guard.
    #[serde(default = "default_min_execution_secs")]
    pub min_execution_secs: u64,

    /// Inter-task delay range in seconds; (0, 0) disables the delay.
    #[serde(default = "default_delay_min_secs")]
    pub delay_min_secs: u64,
    #[serde(default = "default_delay_max_secs")]
    pub delay_max_secs: u64,

    /// Seconds between heartbeat progress lines while a task runs.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Grace period between SIGTERM and SIGKILL when terminating a child
    /// process group.
    #[serde(default = "default_kill_grace_secs")]
    pub kill_grace_secs: u64,
}

fn default_max_execution_secs() -> u64 {
    3600
}

fn default_min_execution_secs() -> u64 {
    10
}

fn default_delay_min_secs() -> u64 {
    60
}

fn default_delay_max_secs() -> u64 {
    120
}

fn default_heartbeat_interval_secs() -> u64 {
    60
}

fn default_kill_grace_secs() -> u64 {
    5
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_execution_secs: default_max_execution_secs(),
            min_execution_secs: default_min_execution_secs(),
            delay_min_secs: default_delay_min_secs(),
            delay_max_secs: default_delay_max_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            kill_grace_secs: default_kill_grace_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Tool used when neither the command line nor the task specifies one.
    #[serde(default)]
    pub tool: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Working directory the child processes run in.
    #[serde(default)]
    pub workspace: Option<String>,
}

/// A fully resolved CLI tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    pub name: String,

    /// Shell command with `{task_file}` and optionally `{model}` placeholders.
    pub cmd_template: String,

    pub needs_proxy: bool,

    pub supports_model: bool,

    #[serde(default)]
    pub default_model: Option<String>,

    #[serde(default)]
    pub models: Vec<String>,

    /// Per-tool override of `runner.min_execution_secs`.
    #[serde(default)]
    pub min_execution_secs: Option<u64>,
}

/// Partial tool definition from config.toml, merged over the built-ins.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolConfigOverride {
    #[serde(default)]
    pub cmd_template: Option<String>,
    #[serde(default)]
    pub needs_proxy: Option<bool>,
    #[serde(default)]
    pub supports_model: Option<bool>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub models: Option<Vec<String>>,
    #[serde(default)]
    pub min_execution_secs: Option<u64>,
}

/// Environment variables added or stripped depending on whether the tool
/// needs a proxy to reach its backing service.
pub const PROXY_ENV_KEYS: [&str; 10] = [
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "ALL_PROXY",
    "SOCKS_PROXY",
    "NO_PROXY",
    "http_proxy",
    "https_proxy",
    "all_proxy",
    "socks_proxy",
    "no_proxy",
];
