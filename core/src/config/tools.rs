//! Built-in CLI tool registry.
//!
//! Each entry defines how to invoke one AI coding CLI: the shell command
//! template (with `{task_file}` / `{model}` placeholders), whether the tool
//! needs proxy environment variables, and which models it accepts.

use std::collections::BTreeMap;

use crate::error::EngineError;

use super::types::{ToolConfig, ToolConfigOverride};

fn builtin_tools() -> Vec<ToolConfig> {
    vec![
        ToolConfig {
            name: "kimi".to_string(),
            cmd_template: r#"kimi --quiet --yolo -p "$(cat {task_file})""#.to_string(),
            needs_proxy: false,
            supports_model: false,
            default_model: None,
            models: Vec::new(),
            min_execution_secs: None,
        },
        ToolConfig {
            name: "agent".to_string(),
            cmd_template: r#"agent --print -f --trust --model {model} "$(cat {task_file})""#
                .to_string(),
            needs_proxy: true,
            supports_model: true,
            default_model: Some("opus-4.6".to_string()),
            models: vec![
                "auto".to_string(),
                "gpt-5.3-codex".to_string(),
                "gpt-5.3-codex-high".to_string(),
                "opus-4.6".to_string(),
                "opus-4.6-thinking".to_string(),
                "opus-4.5".to_string(),
                "sonnet-4.6".to_string(),
                "sonnet-4.5".to_string(),
            ],
            min_execution_secs: None,
        },
        ToolConfig {
            name: "copilot".to_string(),
            cmd_template: r#"copilot --silent --yolo --model {model} -p "$(cat {task_file})""#
                .to_string(),
            needs_proxy: true,
            supports_model: true,
            default_model: Some("claude-opus-4.6".to_string()),
            models: vec![
                "claude-opus-4.6".to_string(),
                "claude-opus-4.5".to_string(),
                "claude-sonnet-4.6".to_string(),
                "claude-sonnet-4.5".to_string(),
                "claude-haiku-4.5".to_string(),
                "gemini-3-pro".to_string(),
                "gpt-5.3-codex".to_string(),
                "gpt-5.1-codex".to_string(),
                "gpt-4.1".to_string(),
            ],
            min_execution_secs: None,
        },
        ToolConfig {
            name: "claude".to_string(),
            cmd_template:
                r#"claude --print --permission-mode bypassPermissions -p "$(cat {task_file})""#
                    .to_string(),
            needs_proxy: true,
            supports_model: false,
            default_model: None,
            models: Vec::new(),
            min_execution_secs: None,
        },
    ]
}

/// Registry of resolved tool configs: built-ins merged with config overrides.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolConfig>,
}

impl ToolRegistry {
    pub fn new(overrides: &BTreeMap<String, ToolConfigOverride>) -> Self {
        let mut tools: BTreeMap<String, ToolConfig> = builtin_tools()
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();

        for (name, over) in overrides {
            let entry = tools.entry(name.clone()).or_insert_with(|| ToolConfig {
                name: name.clone(),
                cmd_template: String::new(),
                needs_proxy: false,
                supports_model: false,
                default_model: None,
                models: Vec::new(),
                min_execution_secs: None,
            });
            if let Some(tpl) = &over.cmd_template {
                entry.cmd_template = tpl.clone();
            }
            if let Some(p) = over.needs_proxy {
                entry.needs_proxy = p;
            }
            if let Some(m) = over.supports_model {
                entry.supports_model = m;
            }
            if over.default_model.is_some() {
                entry.default_model = over.default_model.clone();
            }
            if let Some(models) = &over.models {
                entry.models = models.clone();
            }
            if over.min_execution_secs.is_some() {
                entry.min_execution_secs = over.min_execution_secs;
            }
        }

        Self { tools }
    }

    pub fn get(&self, name: &str) -> Result<&ToolConfig, EngineError> {
        self.tools.get(name).ok_or_else(|| EngineError::UnknownTool {
            tool: name.to_string(),
            available: self.names().join(", "),
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

/// Substitute `{task_file}` and `{model}` into a tool's command template.
pub fn build_command(tool: &ToolConfig, task_file: &std::path::Path, model: Option<&str>) -> String {
    let mut cmd = tool
        .cmd_template
        .replace("{task_file}", &task_file.to_string_lossy());
    if let Some(m) = model {
        cmd = cmd.replace("{model}", m);
    }
    cmd
}
