//! Prompt template rendering.
//!
//! Two placeholder forms: `{{key}}` substitutes a single task field, and
//! `#item` substitutes the whole task as pretty-printed JSON.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::task::Task;

static KEY_REGEX: OnceLock<Regex> = OnceLock::new();

fn key_regex() -> &'static Regex {
    KEY_REGEX.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("KEY_REGEX is valid"))
}

/// Render a prompt template against one task.
///
/// `{{key}}` resolves against the task's JSON representation, so both the
/// declared fields and any extra fields carried in the file are reachable.
/// Scalars render bare, objects and arrays as indented JSON, missing keys
/// as the empty string.
pub fn render_prompt(template: &str, task: &Task) -> String {
    let task_value = serde_json::to_value(task).unwrap_or(Value::Null);

    let rendered = key_regex().replace_all(template, |caps: &Captures| {
        match task_value.get(caps[1].trim()) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(value @ (Value::Object(_) | Value::Array(_))) => {
                serde_json::to_string_pretty(value).unwrap_or_default()
            }
            Some(value) => value.to_string(),
        }
    });

    if rendered.contains("#item") {
        let task_json = serde_json::to_string_pretty(&task_value).unwrap_or_default();
        rendered.replace("#item", &task_json)
    } else {
        rendered.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_task() -> Task {
        let mut t = Task::new("T1");
        t.task_name = "refactor".to_string();
        t.description = "split the parser".to_string();
        t.extra.insert(
            "files".to_string(),
            serde_json::json!(["a.rs", "b.rs"]),
        );
        t
    }

    #[test]
    fn key_placeholders_substitute_fields_and_extras() {
        let task = sample_task();
        let out = render_prompt("Do {{task_name}}: {{description}} ({{task_no}})", &task);
        assert_eq!(out, "Do refactor: split the parser (T1)");

        let out = render_prompt("Touch:\n{{files}}", &task);
        assert_eq!(out, "Touch:\n[\n  \"a.rs\",\n  \"b.rs\"\n]");
    }

    #[test]
    fn missing_key_renders_empty() {
        let out = render_prompt("<{{nonexistent}}>", &sample_task());
        assert_eq!(out, "<>");
    }

    #[test]
    fn item_placeholder_expands_to_full_task_json() {
        let out = render_prompt("Task:\n#item", &sample_task());
        assert!(out.starts_with("Task:\n{"));
        assert!(out.contains("\"task_no\": \"T1\""));
        assert!(out.contains("\"files\""));
    }
}
