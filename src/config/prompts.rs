use serde::{Deserialize, Serialize};

use super::defaults::{default_follow_up_template, default_system_prompt, TOOL_RESULT_PLACEHOLDER};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PromptConfig {
    #[serde(default = "default_system_prompt")]
    pub system: String,
    #[serde(default = "default_follow_up_template")]
    pub follow_up: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system: default_system_prompt(),
            follow_up: default_follow_up_template(),
        }
    }
}

impl PromptConfig {
    /// Fills the follow-up template. A template without the placeholder
    /// gets the result appended instead.
    pub fn render_follow_up(&self, tool_result: &str) -> String {
        if self.follow_up.contains(TOOL_RESULT_PLACEHOLDER) {
            self.follow_up.replace(TOOL_RESULT_PLACEHOLDER, tool_result)
        } else {
            format!("{}\n\n{}", self.follow_up.trim_end(), tool_result)
        }
    }
}
