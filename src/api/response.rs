use crate::error::{BridgeError, Result};
use serde_json::Value;

use super::models::ChatResponse;

/// Extract the assistant text from a non-streaming `/api/chat` response.
pub fn extract_content(response_json: &Value) -> Result<String> {
    let response: ChatResponse = serde_json::from_value(response_json.clone())?;

    if let Some(error) = response.error {
        return Err(BridgeError::Model {
            status: 200,
            message: error,
        });
    }

    response
        .message
        .map(|m| m.content)
        .ok_or_else(|| BridgeError::Other("No message in model response".to_string()))
}
