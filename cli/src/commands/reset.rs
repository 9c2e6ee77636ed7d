use std::path::Path;

use batchpilot_core::error::CliError;
use batchpilot_core::task::{load_task_set, reset_tasks, save_task_set, ResetFilter};

use crate::cli::ResetArgs;

use super::run::parse_status;

pub fn handle_reset(dir: &Path, args: &ResetArgs) -> Result<i32, CliError> {
    if !args.all && args.status.is_none() && args.batch.is_none() && args.start.is_none() {
        return Err(CliError::Config(
            "nothing selected: pass --all, --status, --batch, or --start".to_string(),
        ));
    }

    let filter = ResetFilter {
        all: args.all,
        status: args.status.as_deref().map(parse_status).transpose()?,
        batch: args.batch,
        start_from: args.start.clone(),
    };

    let mut set = load_task_set(dir, &args.task_set, None, None)?;
    let outcome = reset_tasks(&mut set, &filter)?;
    if outcome.reset > 0 {
        save_task_set(&set, dir)?;
    }

    println!(
        "✓ Reset {} task(s) in '{}'; {} already clean.",
        outcome.reset, args.task_set, outcome.already_clean
    );
    Ok(0)
}
