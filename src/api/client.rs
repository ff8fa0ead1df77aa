use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::models::{ChatRequest, ModelInfo, ModelList};
use super::response::extract_content;
use super::streaming::ChatStream;
use crate::error::{BridgeError, Result};
use crate::models::ConversationTurn;

/// The inference endpoint as seen by the orchestrator.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// One non-streaming completion; returns the assistant text.
    async fn chat(&self, model: &str, messages: &[ConversationTurn]) -> Result<String>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

pub struct OllamaClient {
    http: reqwest::Client,
    host: String,
}

impl OllamaClient {
    pub fn new(host: &str, request_timeout: Option<Duration>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(limit) = request_timeout {
            builder = builder.timeout(limit);
        }

        Ok(Self {
            http: builder.build()?,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    async fn post_chat(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let url = format!("{}/api/chat", self.host);
        debug!(model = request.model, messages = request.messages.len(), stream = request.stream, "POST {}", url);

        let response = self.http.post(&url).json(request).send().await?;
        ensure_success(response).await
    }

    /// Streamed completion for direct display. Not used by the tool loop.
    pub async fn chat_stream(&self, model: &str, messages: &[ConversationTurn]) -> Result<ChatStream> {
        let request = ChatRequest {
            model,
            messages,
            stream: true,
        };
        let response = self.post_chat(&request).await?;
        Ok(ChatStream::from_response(response))
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(BridgeError::Model {
        status,
        message: error_text,
    })
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn chat(&self, model: &str, messages: &[ConversationTurn]) -> Result<String> {
        let request = ChatRequest {
            model,
            messages,
            stream: false,
        };
        let response = self.post_chat(&request).await?;
        let response_json: Value = response.json().await?;
        extract_content(&response_json)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.host);
        let response = ensure_success(self.http.get(&url).send().await?).await?;
        let list: ModelList = response.json().await?;
        Ok(list.models)
    }
}
