//! Cooperative cancellation shared between the CLI signal handler, the
//! execution loop, and the subprocess supervisor.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// Escalation tiers. `Graceful` finishes the current task's teardown and
/// stops the loop; `Hard` means abandon everything now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CancelTier {
    None = 0,
    Graceful = 1,
    Hard = 2,
}

#[derive(Default)]
struct Inner {
    tier: AtomicU8,
    // Process group of the currently running child, if any. The signal
    // handler uses it to kill the active subprocess directly.
    active_group: Mutex<Option<i32>>,
}

/// Cheaply cloneable cancellation handle. Threaded explicitly through the
/// engine and supervisor; there are no module-level globals.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(&self) -> CancelTier {
        match self.inner.tier.load(Ordering::SeqCst) {
            0 => CancelTier::None,
            1 => CancelTier::Graceful,
            _ => CancelTier::Hard,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.tier() != CancelTier::None
    }

    /// Bump the tier one step (None → Graceful → Hard) and return the new
    /// tier. Repeated signals saturate at `Hard`.
    pub fn escalate(&self) -> CancelTier {
        self.inner.tier.fetch_add(1, Ordering::SeqCst);
        // Saturate so a signal storm can't wrap the counter.
        let _ = self
            .inner
            .tier
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                (t > 2).then_some(2)
            });
        self.tier()
    }

    pub fn set_active_group(&self, pgid: Option<i32>) {
        *self.inner.active_group.lock().unwrap_or_else(|e| e.into_inner()) = pgid;
    }

    pub fn active_group(&self) -> Option<i32> {
        *self.inner.active_group.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_walks_the_tiers_and_saturates() {
        let token = CancelToken::new();
        assert_eq!(token.tier(), CancelTier::None);
        assert!(!token.is_cancelled());

        assert_eq!(token.escalate(), CancelTier::Graceful);
        assert_eq!(token.escalate(), CancelTier::Hard);
        assert_eq!(token.escalate(), CancelTier::Hard);
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        token.escalate();
        assert_eq!(other.tier(), CancelTier::Graceful);

        other.set_active_group(Some(1234));
        assert_eq!(token.active_group(), Some(1234));
    }
}
