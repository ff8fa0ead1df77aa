pub mod backend;
pub mod client;
pub mod manager;
pub mod types;

pub use backend::ToolBackend;
pub use client::StdioBackend;
pub use manager::{BackendConnection, ConnectionManager, ConnectionState};
pub use types::{
    McpResource, McpTool, McpToolCall, McpToolResult, ResourceReadResponse, ToolContent,
};
