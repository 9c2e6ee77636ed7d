use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("pty allocation failed: {0}")]
    Pty(String),
    #[error("stream io error: {stream} {source}")]
    StreamIo {
        stream: &'static str,
        source: std::io::Error,
    },
    #[error("log file error: {path}: {source}")]
    LogFile {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("task set not found: {0}")]
    NotFound(String),
    #[error("invalid task set {path}: {reason}")]
    Invalid { path: String, reason: String },
    #[error("task '{0}' not found")]
    UnknownTask(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for the command-line front end.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),
    #[error("unknown tool '{tool}'. Available: {available}")]
    UnknownTool { tool: String, available: String },
    #[error("unknown model '{model}' for tool '{tool}'. Available: {available}")]
    UnknownModel {
        tool: String,
        model: String,
        available: String,
    },
    #[error("tool binary '{0}' not found in PATH")]
    ToolNotFound(String),
    #[error("runner failed: {0}")]
    Runner(#[from] RunnerError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
