//! Subprocess execution: cancellation, process-group termination, and the
//! output-streaming supervisor.

mod cancel;
mod kill;
mod supervisor;

pub use cancel::{CancelTier, CancelToken};
pub use kill::{kill_group, terminate_group};
pub use supervisor::{execute, ExecOutcome, ExecRequest};

use std::collections::BTreeMap;

use crate::config::PROXY_ENV_KEYS;

/// Build the child environment from the parent's, stripping the proxy
/// variables when the tool must talk to its backend directly.
pub fn build_child_env(needs_proxy: bool) -> BTreeMap<String, String> {
    filter_proxy_env(std::env::vars(), needs_proxy)
}

fn filter_proxy_env(
    vars: impl IntoIterator<Item = (String, String)>,
    needs_proxy: bool,
) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = vars.into_iter().collect();
    if !needs_proxy {
        for key in PROXY_ENV_KEYS {
            env.remove(key);
        }
    }
    env
}
