//! Process-group termination with SIGTERM → SIGKILL escalation. One
//! primitive serves timeout, interrupt, and final-cleanup paths.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

const ALIVE_POLL: Duration = Duration::from_millis(100);

/// Ask the whole group to exit, give it `grace` to comply, then force it.
pub async fn terminate_group(pgid: i32, grace: Duration) {
    if !imp::group_alive(pgid) {
        return;
    }
    debug!(pgid, "sending SIGTERM to process group");
    imp::signal_group(pgid, imp::TERM);

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        if !imp::group_alive(pgid) {
            return;
        }
        sleep(ALIVE_POLL).await;
    }

    debug!(pgid, "grace expired, sending SIGKILL to process group");
    imp::signal_group(pgid, imp::KILL);
}

/// Immediate SIGKILL, no grace. Used by the second Ctrl-C.
pub fn kill_group(pgid: i32) {
    imp::signal_group(pgid, imp::KILL);
}

#[cfg(unix)]
mod imp {
    pub const TERM: i32 = libc::SIGTERM;
    pub const KILL: i32 = libc::SIGKILL;

    pub fn signal_group(pgid: i32, sig: i32) {
        unsafe {
            libc::killpg(pgid, sig);
        }
    }

    pub fn group_alive(pgid: i32) -> bool {
        unsafe { libc::killpg(pgid, 0) == 0 }
    }
}

#[cfg(not(unix))]
mod imp {
    pub const TERM: i32 = 15;
    pub const KILL: i32 = 9;

    pub fn signal_group(_pgid: i32, _sig: i32) {}

    pub fn group_alive(_pgid: i32) -> bool {
        false
    }
}
