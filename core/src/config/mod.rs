mod load;
mod tools;
mod types;

pub use load::{get_data_dir, load_default, load_from_str};
pub use tools::{build_command, ToolRegistry};
pub use types::{
    AppConfig, DefaultsConfig, LoggingConfig, RunnerConfig, ToolConfig, ToolConfigOverride,
    PROXY_ENV_KEYS,
};
