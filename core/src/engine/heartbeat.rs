//! Cosmetic heartbeat while a task runs: a spinner and elapsed time in the
//! terminal title, plus a periodic progress line for logs that scroll.

use std::io::Write;
use std::time::Duration;

use tokio::time::Instant;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn set_terminal_title(text: &str) {
    let mut out = std::io::stdout();
    let _ = write!(out, "\x1b]0;{text}\x07");
    let _ = out.flush();
}

pub fn reset_terminal_title() {
    set_terminal_title("");
}

fn fmt_elapsed(secs: u64) -> String {
    let (mins, s) = (secs / 60, secs % 60);
    let (hours, m) = (mins / 60, mins % 60);
    if hours > 0 {
        format!("{hours}h{m:02}m{s:02}s")
    } else {
        format!("{mins}m{s:02}s")
    }
}

/// Handle to the background ticker. Dropping without `stop` leaves the task
/// running, so the engine always stops it explicitly.
pub struct Heartbeat {
    handle: tokio::task::JoinHandle<()>,
}

impl Heartbeat {
    /// Tick every second; emit a progress line every `interval_secs` ticks
    /// unless quiet.
    pub fn start(task_no: String, interval_secs: u64, quiet: bool) -> Self {
        let handle = tokio::spawn(async move {
            let start = Instant::now();
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.tick().await;
            let mut tick: u64 = 0;
            loop {
                ticker.tick().await;
                tick += 1;
                let elapsed = start.elapsed().as_secs();
                let spinner = SPINNER_FRAMES[(tick as usize) % SPINNER_FRAMES.len()];
                set_terminal_title(&format!(
                    "{spinner} {} | Task {task_no} | batchpilot",
                    fmt_elapsed(elapsed)
                ));
                if !quiet && interval_secs > 0 && tick % interval_secs == 0 {
                    println!(
                        "  ♥ task {task_no} still running ({} elapsed)",
                        fmt_elapsed(elapsed)
                    );
                }
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
        reset_terminal_title();
    }
}
