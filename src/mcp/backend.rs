use async_trait::async_trait;

use super::types::{McpResource, McpTool, McpToolCall, McpToolResult, ResourceReadResponse};
use crate::error::Result;

/// Request/response contract every tool server speaks.
///
/// Implementations serialize their own requests: one outstanding call per
/// backend at a time.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<McpTool>>;

    /// Fails with `BridgeError::Unsupported` when the server has no resources.
    async fn list_resources(&self) -> Result<Vec<McpResource>>;

    async fn call_tool(&self, call: &McpToolCall) -> Result<McpToolResult>;

    async fn read_resource(&self, uri: &str) -> Result<ResourceReadResponse>;

    async fn close(&self) -> Result<()>;
}
