use serde::Serialize;
use serde_json::Value;

/// Outcome of one user turn. Serializes to the flat JSON shape consumed by
/// front ends (`response`, or `toolUsed`/`finalResponse`/..., or `error`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChatResult {
    Direct {
        response: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolAugmented {
        tool_used: String,
        tool_result: Value,
        final_response: String,
        raw_response: String,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_response: Option<String>,
    },
}

impl ChatResult {
    /// Text to show the user, whichever branch produced it.
    pub fn text(&self) -> &str {
        match self {
            ChatResult::Direct { response } => response,
            ChatResult::ToolAugmented { final_response, .. } => final_response,
            ChatResult::Failed { error, .. } => error,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ChatResult::Failed { .. })
    }

    pub fn tool_used(&self) -> Option<&str> {
        match self {
            ChatResult::ToolAugmented { tool_used, .. } => Some(tool_used),
            _ => None,
        }
    }
}
