use std::path::Path;

use batchpilot_core::error::CliError;
use batchpilot_core::scheduler::{execution_plan, validate_dependencies};
use batchpilot_core::task::load_task_set;

use crate::cli::SetArg;

pub fn handle_plan(dir: &Path, args: &SetArg) -> Result<i32, CliError> {
    let set = load_task_set(dir, &args.task_set, None, None)?;

    let validation = validate_dependencies(&set);
    for warning in &validation.warnings {
        eprintln!("⚠ {warning}");
    }
    for error in &validation.errors {
        eprintln!("✗ {error}");
    }

    let waves = execution_plan(&set);
    println!("Execution plan for '{}':", args.task_set);
    for (i, wave) in waves.iter().enumerate() {
        let nos: Vec<&str> = wave.iter().map(|t| t.task_no.as_str()).collect();
        println!("  wave {}: {}", i + 1, nos.join(", "));
    }

    Ok(if validation.is_valid() { 0 } else { 1 })
}
