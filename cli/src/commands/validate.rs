use std::path::Path;

use batchpilot_core::error::CliError;
use batchpilot_core::scheduler::validate_dependencies;
use batchpilot_core::task::load_task_set;

use crate::cli::SetArg;

pub fn handle_validate(dir: &Path, args: &SetArg) -> Result<i32, CliError> {
    let set = load_task_set(dir, &args.task_set, None, None)?;
    let result = validate_dependencies(&set);

    for warning in &result.warnings {
        eprintln!("⚠ {warning}");
    }
    for error in &result.errors {
        eprintln!("✗ {error}");
    }

    if result.is_valid() {
        println!(
            "✓ '{}' is valid ({} tasks, no dependency problems)",
            args.task_set,
            set.tasks.len()
        );
        Ok(0)
    } else {
        Ok(1)
    }
}
