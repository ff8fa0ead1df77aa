#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use toolbridge::api::{ChatModel, ModelInfo};
use toolbridge::mcp::{McpResource, McpTool, McpToolCall, McpToolResult, ResourceReadResponse, ToolBackend};
use toolbridge::models::ConversationTurn;
use toolbridge::{BridgeError, Result};

/// Model that answers from a script and records every prompt it receives.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<Vec<ConversationTurn>>>,
    models: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn push_error(&self, error: BridgeError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn prompts(&self) -> Vec<Vec<ConversationTurn>> {
        self.prompts.lock().unwrap().clone()
    }

    /// Model names requested, one per call.
    pub fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, model: &str, messages: &[ConversationTurn]) -> Result<String> {
        self.models.lock().unwrap().push(model.to_string());
        self.prompts.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            name: "scripted".to_string(),
            size: None,
            modified_at: None,
        }])
    }
}

/// In-memory tool server.
#[derive(Default)]
pub struct FakeBackend {
    pub tools: Vec<McpTool>,
    /// `None` answers resource listing with "unsupported".
    pub resources: Option<Vec<McpResource>>,
    pub results: HashMap<String, McpToolResult>,
    pub delay: Option<Duration>,
    /// Resource listing fails with an ordinary error.
    pub fail_resources: bool,
    pub fail_close: bool,
    pub calls: Mutex<Vec<McpToolCall>>,
    pub closed: AtomicBool,
}

impl FakeBackend {
    pub fn with_tools(names: &[&str]) -> Self {
        Self {
            tools: names.iter().map(|name| tool(name, None)).collect(),
            ..Self::default()
        }
    }

    pub fn returning(mut self, tool: &str, result: McpToolResult) -> Self {
        self.results.insert(tool.to_string(), result);
        self
    }

    pub fn recorded_calls(&self) -> Vec<McpToolCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub fn tool(name: &str, input_schema: Option<Value>) -> McpTool {
    McpTool {
        name: name.to_string(),
        description: Some(format!("The {} tool", name)),
        input_schema,
    }
}

#[async_trait]
impl ToolBackend for FakeBackend {
    async fn list_tools(&self) -> Result<Vec<McpTool>> {
        Ok(self.tools.clone())
    }

    async fn list_resources(&self) -> Result<Vec<McpResource>> {
        if self.fail_resources {
            return Err(BridgeError::Invocation("resource index is corrupt".to_string()));
        }
        self.resources
            .clone()
            .ok_or_else(|| BridgeError::Unsupported("resources/list".to_string()))
    }

    async fn call_tool(&self, call: &McpToolCall) -> Result<McpToolResult> {
        self.calls.lock().unwrap().push(call.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.results
            .get(&call.name)
            .cloned()
            .ok_or_else(|| BridgeError::Invocation(format!("no such tool: {}", call.name)))
    }

    async fn read_resource(&self, uri: &str) -> Result<ResourceReadResponse> {
        match &self.resources {
            Some(resources) if resources.iter().any(|r| r.uri == uri) => {
                Ok(serde_json::from_value(serde_json::json!({
                    "contents": [{"uri": uri, "mimeType": "text/plain", "text": "row 1"}]
                }))?)
            }
            _ => Err(BridgeError::resource_not_found(uri)),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(BridgeError::Other("broken pipe".to_string()));
        }
        Ok(())
    }
}
