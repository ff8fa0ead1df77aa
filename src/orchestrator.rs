//! The chat state machine: prompt, optional tool dispatch, re-prompt.
//!
//! Each user turn walks `Idle -> AwaitingModel`, then either returns the
//! model's reply directly or goes through `ToolRequested ->
//! AwaitingToolResult -> AwaitingFollowUpModel` before coming back to
//! `Idle`. Every failure inside a turn is turned into a
//! [`ChatResult::Failed`]; nothing escapes `chat()`.

use jsonschema::JSONSchema;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::api::{ChatModel, ModelInfo, OllamaClient};
use crate::config::{Config, PromptConfig};
use crate::error::{BridgeError, Result};
use crate::history::ConversationHistory;
use crate::interpreter;
use crate::mcp::{ConnectionManager, ResourceReadResponse};
use crate::models::{ChatResult, ConversationTurn, ToolDescriptor, ToolInvocationRequest};
use crate::registry::ToolRegistry;

pub const REASONING_START: &str = "<think>";
pub const REASONING_END: &str = "</think>";

static REASONING_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        "(?s){}.*?{}",
        regex::escape(REASONING_START),
        regex::escape(REASONING_END)
    );
    Regex::new(&pattern).expect("reasoning pattern is valid")
});

/// Removes every `<think>...</think>` block (shortest match) and trims.
pub fn strip_reasoning(text: &str) -> String {
    REASONING_BLOCK.replace_all(text, "").trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    AwaitingModel,
    ToolRequested,
    AwaitingToolResult,
    AwaitingFollowUpModel,
}

/// Drives one conversation. `chat` takes `&mut self`, so a single instance
/// never runs two turns at once; use one instance per concurrent session.
pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    connections: ConnectionManager,
    registry: ToolRegistry,
    prompts: PromptConfig,
    default_model: String,
    history: ConversationHistory,
    state: ChatState,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        connections: ConnectionManager,
        prompts: PromptConfig,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            model,
            connections,
            registry: ToolRegistry::new(),
            prompts,
            default_model: default_model.into(),
            history: ConversationHistory::default(),
            state: ChatState::Idle,
        }
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = ConversationHistory::with_capacity(capacity);
        self
    }

    /// Builds the Ollama client, launches every enabled tool server and
    /// discovers their catalogs. Servers that fail to start are skipped.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let client = OllamaClient::new(
            &config.host,
            config.request_timeout_secs.map(Duration::from_secs),
        )?;

        let tool_timeout = match config.tool_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let mut connections = ConnectionManager::new(tool_timeout);
        if config.tools_enabled {
            let connected = connections.connect_all(config.enabled_servers()).await;
            info!(connected, configured = config.servers.len(), "tool servers started");
        }

        let mut orchestrator = Self::new(
            Arc::new(client),
            connections,
            config.prompts.clone(),
            config.model.clone(),
        )
        .with_history_capacity(config.history_turns);
        orchestrator.refresh_tools().await;
        Ok(orchestrator)
    }

    pub async fn refresh_tools(&mut self) {
        self.registry.refresh(&self.connections).await;
    }

    pub async fn chat(&mut self, user_message: &str, model_override: Option<&str>) -> ChatResult {
        let result = self.run_turn(user_message, model_override).await;
        self.transition(ChatState::Idle);
        result
    }

    async fn run_turn(&mut self, user_message: &str, model_override: Option<&str>) -> ChatResult {
        let model = model_override.unwrap_or(&self.default_model).to_string();
        let user_turn = ConversationTurn::user(user_message);
        let mut messages = self.compose_prompt(&user_turn);

        self.transition(ChatState::AwaitingModel);
        let first_reply = match self.model.chat(&model, &messages).await {
            Ok(reply) => reply,
            Err(e) => {
                let error = format!("Model request failed: {}", e);
                self.record_error(user_turn, &error);
                return ChatResult::Failed {
                    error,
                    raw_response: None,
                };
            }
        };

        let request = match interpreter::extract(&first_reply) {
            Ok(request) => request,
            Err(e) if e.is_malformed_directive() => {
                self.transition(ChatState::ToolRequested);
                let error = format!("Could not parse tool call: {}", e);
                self.record_error(user_turn, &error);
                return ChatResult::Failed {
                    error,
                    raw_response: Some(first_reply),
                };
            }
            Err(_) => {
                self.history
                    .push_exchange(user_turn, ConversationTurn::assistant(first_reply.clone()));
                return ChatResult::Direct {
                    response: first_reply,
                };
            }
        };
        self.transition(ChatState::ToolRequested);
        self.transition(ChatState::AwaitingToolResult);
        let tool_result = match self.dispatch(&request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %request.tool, error = %e, "tool call failed");
                let error = format!("Tool call failed: {}", e);
                self.record_error(user_turn, &error);
                return ChatResult::Failed {
                    error,
                    raw_response: Some(first_reply),
                };
            }
        };

        let follow_up = self.prompts.render_follow_up(&tool_result.to_string());
        messages.push(ConversationTurn::assistant(first_reply.clone()));
        messages.push(ConversationTurn::user(follow_up));

        self.transition(ChatState::AwaitingFollowUpModel);
        let second_reply = match self.model.chat(&model, &messages).await {
            Ok(reply) => reply,
            Err(e) => {
                let error = format!("Model request failed: {}", e);
                self.record_error(user_turn, &error);
                return ChatResult::Failed {
                    error,
                    raw_response: Some(first_reply),
                };
            }
        };

        let final_response = strip_reasoning(&second_reply);
        self.history.push_exchange(
            user_turn,
            ConversationTurn::assistant(format!("[Used tool: {}] {}", request.tool, final_response)),
        );

        ChatResult::ToolAugmented {
            tool_used: request.tool,
            tool_result,
            final_response,
            raw_response: first_reply,
        }
    }

    /// Resolves the tool, checks its arguments and runs it on the owning backend.
    async fn dispatch(&self, request: &ToolInvocationRequest) -> Result<Value> {
        let descriptor = self.registry.resolve(&request.tool)?;
        let arguments = request.arguments();
        validate_arguments(descriptor, &arguments)?;

        info!(tool = %descriptor.name, backend = %descriptor.backend, "calling tool");
        let result = self
            .connections
            .invoke(&descriptor.backend, &descriptor.name, arguments)
            .await?;
        Ok(serde_json::to_value(result)?)
    }

    fn compose_prompt(&self, user_turn: &ConversationTurn) -> Vec<ConversationTurn> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ConversationTurn::system(self.system_prompt()));
        messages.extend(self.history.iter().cloned());
        messages.push(user_turn.clone());
        messages
    }

    fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "Today's date is {}.\n\n{}",
            Config::get_current_date(),
            self.prompts.system
        );

        prompt.push_str("\n\nAvailable tools:");
        if self.registry.list().is_empty() {
            prompt.push_str(" none");
        }
        for tool in self.registry.tools() {
            if tool.description.is_empty() {
                prompt.push_str(&format!("\n- {}", tool.name));
            } else {
                prompt.push_str(&format!("\n- {}: {}", tool.name, tool.description));
            }
        }

        let resources = self.registry.resources();
        if !resources.is_empty() {
            prompt.push_str("\n\nAvailable resources:");
            for uri in resources {
                prompt.push_str(&format!("\n- {}", uri));
            }
        }
        prompt
    }

    fn record_error(&mut self, user_turn: ConversationTurn, error: &str) {
        self.history
            .push_exchange(user_turn, ConversationTurn::assistant(format!("Error: {}", error)));
    }

    fn transition(&mut self, next: ChatState) {
        debug!(from = ?self.state, to = ?next, "chat state");
        self.state = next;
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn conversation_history(&self) -> Vec<ConversationTurn> {
        self.history.to_vec()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn model(&self) -> &str {
        &self.default_model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.default_model = model.into();
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        self.model.list_models().await
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ResourceReadResponse> {
        let resource = self.registry.resolve_resource(uri)?;
        self.connections.read_resource(&resource.backend, uri).await
    }

    /// Closes every backend; returns how many failed to close cleanly.
    pub async fn shutdown(&mut self) -> usize {
        self.connections.close_all().await.len()
    }
}

/// Checks `arguments` against the tool's input schema, if it has one.
fn validate_arguments(tool: &ToolDescriptor, arguments: &Value) -> Result<()> {
    let Some(schema) = &tool.input_schema else {
        return Ok(());
    };

    let compiled = JSONSchema::compile(schema).map_err(|e| {
        BridgeError::Invocation(format!("Invalid schema for tool '{}': {}", tool.name, e))
    })?;

    if let Err(errors) = compiled.validate(arguments) {
        let error_messages: Vec<String> = errors
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect();
        return Err(BridgeError::Invocation(format!(
            "Tool '{}' argument validation failed: {}",
            tool.name,
            error_messages.join("; ")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_reasoning_removes_blocks() {
        let raw = "<think>The user wants weather.\nLet me think.</think>\n\nIt is 21°C in Rome.";
        assert_eq!(strip_reasoning(raw), "It is 21°C in Rome.");
    }

    #[test]
    fn test_strip_reasoning_is_non_greedy() {
        let raw = "<think>a</think>Keep this.<think>b</think> And this.";
        assert_eq!(strip_reasoning(raw), "Keep this. And this.");
    }

    #[test]
    fn test_strip_reasoning_leaves_unclosed_marker() {
        let raw = "<think>never closed. Answer.";
        assert_eq!(strip_reasoning(raw), raw);
    }

    #[test]
    fn test_validate_arguments_rejects_missing_required() {
        let tool = ToolDescriptor {
            name: "get_current_weather".to_string(),
            backend: "weather".to_string(),
            description: String::new(),
            input_schema: Some(json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            })),
        };

        assert!(validate_arguments(&tool, &json!({"city": "Rome"})).is_ok());
        let err = validate_arguments(&tool, &json!({})).unwrap_err();
        assert!(err.to_string().contains("argument validation failed"));
    }

    #[test]
    fn test_validate_arguments_without_schema() {
        let tool = ToolDescriptor {
            name: "ping".to_string(),
            backend: "b".to_string(),
            description: String::new(),
            input_schema: None,
        };
        assert!(validate_arguments(&tool, &json!({"anything": 1})).is_ok());
    }
}
