use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use batchpilot_core::error::{CliError, EngineError};

mod cli;
mod commands;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = batchpilot_core::config::load_default().map_err(|e| CliError::Config(e.to_string()))?;
    init_tracing(&cfg.logging).map_err(CliError::Config)?;

    let dir = args.dir.as_path();
    match args.command {
        cli::Commands::Run(run_args) => commands::run::handle_run(dir, &run_args, false, cfg).await,
        cli::Commands::DryRun(run_args) => {
            commands::run::handle_run(dir, &run_args, true, cfg).await
        }
        cli::Commands::Reset(reset_args) => commands::reset::handle_reset(dir, &reset_args),
        cli::Commands::List(list_args) => commands::list::handle_list(dir, &list_args),
        cli::Commands::Status(status_args) => commands::status::handle_status(dir, &status_args),
        cli::Commands::Plan(set_arg) => commands::plan::handle_plan(dir, &set_arg),
        cli::Commands::Validate(set_arg) => commands::validate::handle_validate(dir, &set_arg),
    }
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 0: success
    // 1: run finished with failures (returned as a normal exit code)
    // 11: config error
    // 20: spawn / state / IO error
    // 50: internal/uncategorized
    match e {
        CliError::Config(_) => 11,
        CliError::Engine(ee) => match ee {
            EngineError::Config(_)
            | EngineError::UnknownTool { .. }
            | EngineError::UnknownModel { .. } => 11,
            EngineError::ToolNotFound(_)
            | EngineError::Runner(_)
            | EngineError::State(_)
            | EngineError::Io(_) => 20,
        },
        CliError::State(_) => 20,
        CliError::Io(_) => 20,
        CliError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &batchpilot_core::config::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("batchpilot"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("batchpilot.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
