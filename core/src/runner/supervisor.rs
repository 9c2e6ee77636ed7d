//! Subprocess supervision: spawn the tool command under a PTY (falling back
//! to plain pipes), stream its output to the console and a raw log file, and
//! enforce wall-clock and cancellation limits.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::RunnerError;

use super::cancel::CancelToken;
use super::kill::terminate_group;

const POLL_TICK: Duration = Duration::from_millis(250);
const CHUNK_CAPACITY: usize = 64;
const READ_BUF: usize = 8192;

/// Everything needed to run one tool invocation.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Shell command line, executed via `sh -c`.
    pub command: String,
    pub cwd: PathBuf,
    /// Complete child environment; the parent env is never inherited
    /// implicitly.
    pub env: BTreeMap<String, String>,
    pub log_path: PathBuf,
    pub max_execution_secs: u64,
    pub kill_grace_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecOutcome {
    /// None when the child died to a signal before reporting a code.
    pub exit_code: Option<i32>,
    pub elapsed_seconds: f64,
    pub timed_out: bool,
    pub interrupted: bool,
}

struct Spawned {
    chunk_rx: mpsc::Receiver<Vec<u8>>,
    exit_rx: oneshot::Receiver<Option<i32>>,
    pgid: Option<i32>,
}

/// Run the request to completion. PTY mode is preferred so interactive
/// tools see a terminal; if the PTY can't be allocated the child runs on
/// plain pipes with stdout and stderr interleaved into one stream.
pub async fn execute(req: &ExecRequest, cancel: &CancelToken) -> Result<ExecOutcome, RunnerError> {
    let spawned = match spawn_pty(req) {
        Ok(spawned) => spawned,
        Err(err) => {
            warn!(error = %err, "pty spawn failed, falling back to pipes");
            spawn_piped(req)?
        }
    };
    supervise(req, cancel, spawned).await
}

fn pty_size() -> PtySize {
    let read = |key: &str, fallback: u16| {
        std::env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(fallback)
    };
    PtySize {
        rows: read("LINES", 50),
        cols: read("COLUMNS", 120),
        pixel_width: 0,
        pixel_height: 0,
    }
}

fn spawn_pty(req: &ExecRequest) -> Result<Spawned, RunnerError> {
    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(pty_size())
        .map_err(|e| RunnerError::Pty(e.to_string()))?;

    let mut builder = CommandBuilder::new("sh");
    builder.args(["-c", &req.command]);
    builder.cwd(&req.cwd);
    builder.env_clear();
    for (key, value) in &req.env {
        builder.env(key, value);
    }
    if !req.env.contains_key("TERM") {
        builder.env("TERM", "xterm-256color");
    }

    let mut child = pair
        .slave
        .spawn_command(builder)
        .map_err(|e| RunnerError::Pty(e.to_string()))?;
    drop(pair.slave);

    // The PTY child is its own session leader, so pid doubles as pgid.
    let pgid = child.process_id().map(|id| id as i32);

    let mut reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| RunnerError::Pty(e.to_string()))?;
    let master = pair.master;

    let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<u8>>(CHUNK_CAPACITY);
    tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; READ_BUF];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if chunk_tx.blocking_send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
        // Keep the master open until EOF; dropping it earlier would close
        // the child's terminal under it.
        drop(master);
    });

    let (exit_tx, exit_rx) = oneshot::channel();
    std::thread::spawn(move || {
        let code = child.wait().ok().map(|status| status.exit_code() as i32);
        let _ = exit_tx.send(code);
    });

    Ok(Spawned {
        chunk_rx,
        exit_rx,
        pgid,
    })
}

fn spawn_piped(req: &ExecRequest) -> Result<Spawned, RunnerError> {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c")
        .arg(&req.command)
        .current_dir(&req.cwd)
        .env_clear()
        .envs(&req.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|e| RunnerError::Spawn(e.to_string()))?;
    let pgid = child.id().map(|id| id as i32);

    let stdout = child.stdout.take().ok_or_else(|| RunnerError::StreamIo {
        stream: "stdout",
        source: std::io::Error::other("child stdout not captured"),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| RunnerError::StreamIo {
        stream: "stderr",
        source: std::io::Error::other("child stderr not captured"),
    })?;

    let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<u8>>(CHUNK_CAPACITY);
    pump(stdout, chunk_tx.clone());
    pump(stderr, chunk_tx);

    let (exit_tx, exit_rx) = oneshot::channel();
    tokio::spawn(async move {
        let code = child.wait().await.ok().and_then(|status| status.code());
        let _ = exit_tx.send(code);
    });

    Ok(Spawned {
        chunk_rx,
        exit_rx,
        pgid,
    })
}

fn pump<R>(mut rd: R, tx: mpsc::Sender<Vec<u8>>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; READ_BUF];
        loop {
            match rd.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

async fn supervise(
    req: &ExecRequest,
    cancel: &CancelToken,
    mut spawned: Spawned,
) -> Result<ExecOutcome, RunnerError> {
    let start = Instant::now();
    let deadline = start + Duration::from_secs(req.max_execution_secs);
    let grace = Duration::from_secs(req.kill_grace_secs);

    cancel.set_active_group(spawned.pgid);

    let mut log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&req.log_path)
        .map_err(|e| RunnerError::LogFile {
            path: req.log_path.display().to_string(),
            source: e,
        })?;
    let mut stdout = std::io::stdout();

    let mut timed_out = false;
    let mut interrupted = false;

    loop {
        // Checked every iteration, not just on idle ticks: a child that
        // streams continuously must still hit the deadline and observe
        // cancellation.
        if cancel.is_cancelled() {
            interrupted = true;
            break;
        }
        if Instant::now() >= deadline {
            timed_out = true;
            break;
        }

        match tokio::time::timeout(POLL_TICK, spawned.chunk_rx.recv()).await {
            Ok(Some(chunk)) => {
                let _ = stdout.write_all(&chunk);
                let _ = stdout.flush();
                log.write_all(&chunk)
                    .and_then(|_| log.flush())
                    .map_err(|e| RunnerError::LogFile {
                        path: req.log_path.display().to_string(),
                        source: e,
                    })?;
            }
            // Output stream closed; the child is done or dying.
            Ok(None) => break,
            Err(_) => {}
        }
    }

    if (timed_out || interrupted) && spawned.pgid.is_some() {
        terminate_group(spawned.pgid.unwrap_or_default(), grace).await;
    }

    // Preserve whatever output was still in flight when we stopped reading.
    while let Ok(Some(chunk)) = tokio::time::timeout(POLL_TICK, spawned.chunk_rx.recv()).await {
        let _ = log.write_all(&chunk);
    }
    let _ = log.flush();

    // Reap with a cap; a child that survives EOF gets one more kill pass.
    let reap_cap = grace + Duration::from_secs(1);
    let exit_code = match tokio::time::timeout(reap_cap, &mut spawned.exit_rx).await {
        Ok(result) => result.ok().flatten(),
        Err(_) => {
            if let Some(pgid) = spawned.pgid {
                debug!(pgid, "child still alive after stream EOF, cleaning up");
                terminate_group(pgid, grace).await;
            }
            spawned.exit_rx.await.ok().flatten()
        }
    };

    cancel.set_active_group(None);

    Ok(ExecOutcome {
        exit_code,
        elapsed_seconds: start.elapsed().as_secs_f64(),
        timed_out,
        interrupted,
    })
}
