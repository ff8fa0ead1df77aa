pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen2.5:7b";
pub const TOOL_RESULT_PLACEHOLDER: &str = "{TOOL_RESULT}";

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful assistant with access to external tools.

When a tool is needed to answer, reply with ONLY a JSON object of this exact shape and nothing else:
{"action": "tool_call", "tool": "<tool name>", "args": {<arguments>}}

Use only the tools listed below. When no tool is needed, answer the user directly in plain text."#;

pub const DEFAULT_FOLLOW_UP_TEMPLATE: &str = r#"The tool returned this result:
{TOOL_RESULT}

Using this result, answer my previous question in natural language. Do not call another tool."#;

pub fn default_enabled() -> bool {
    true
}

pub fn default_tool_timeout() -> u64 {
    30
}

pub fn default_history_turns() -> usize {
    crate::history::DEFAULT_HISTORY_TURNS
}

pub fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

pub fn default_follow_up_template() -> String {
    DEFAULT_FOLLOW_UP_TEMPLATE.to_string()
}

pub fn is_default_enabled(value: &bool) -> bool {
    *value == default_enabled()
}
