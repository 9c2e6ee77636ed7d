mod model;
mod reset;
mod set;

pub use model::{Task, TaskCliOverride, TaskStatus};
pub use reset::{reset_tasks, ResetFilter, ResetOutcome};
pub use set::{
    backup_task_set, discover_task_sets, load_task_set, save_task_set, task_set_stats, TaskSet,
    TaskSetStats,
};
