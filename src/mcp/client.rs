use async_trait::async_trait;
use serde_json::{json, Value};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::backend::ToolBackend;
use super::types::{
    InitializeResult, McpResource, McpTool, McpToolCall, McpToolResult, ResourceListResponse,
    ResourceReadResponse, ToolListResponse,
};
use crate::config::{expand_env_vars, ServerConfig};
use crate::error::{BridgeError, Result};

// MCP Protocol constants
const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const CLIENT_NAME: &str = "toolbridge";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const METHOD_NOT_FOUND: i64 = -32601;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// A tool server running as a child process, spoken to with line-delimited
/// JSON-RPC over its stdin/stdout.
pub struct StdioBackend {
    id: String,
    channel: Mutex<StdioChannel>,
}

struct StdioChannel {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

impl StdioBackend {
    /// Spawns the server and completes the `initialize` handshake.
    pub async fn spawn(id: &str, server: &ServerConfig) -> Result<Self> {
        let mut cmd = Command::new(&server.command);
        cmd.args(&server.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // Values are never logged, only names.
        for (key, value) in expand_env_vars(&server.env) {
            debug!(backend = id, var = %key, "setting env var");
            cmd.env(key, value);
        }

        let mut process = cmd
            .spawn()
            .map_err(|e| BridgeError::connection(id, format!("failed to launch '{}': {}", server.command, e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| BridgeError::connection(id, "child stdin unavailable"))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| BridgeError::connection(id, "child stdout unavailable"))?;

        let backend = Self {
            id: id.to_string(),
            channel: Mutex::new(StdioChannel {
                process,
                stdin,
                stdout: BufReader::new(stdout),
                next_id: 1,
            }),
        };

        backend
            .initialize()
            .await
            .map_err(|e| BridgeError::connection(id, e))?;

        Ok(backend)
    }

    async fn initialize(&self) -> Result<()> {
        let init_params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": CLIENT_VERSION
            }
        });

        let mut channel = self.channel.lock().await;
        let response = channel.request("initialize", Some(init_params)).await?;
        let init_result: InitializeResult = serde_json::from_value(response)?;

        info!(
            backend = %self.id,
            server = %init_result.server_info.name,
            version = %init_result.server_info.version,
            "connected to tool server"
        );

        channel
            .notify("notifications/initialized", None)
            .await
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let mut channel = self.channel.lock().await;
        channel.request(method, params).await
    }
}

impl StdioChannel {
    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params.unwrap_or(json!({}))
        });
        self.write_message(&request).await?;

        let mut line = String::new();
        loop {
            line.clear();
            let read = self.stdout.read_line(&mut line).await?;
            if read == 0 {
                return Err(BridgeError::Invocation(format!(
                    "tool server closed its output while waiting for '{}'",
                    method
                )));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response: Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(e) => {
                    debug!(error = %e, "ignoring non-JSON line from tool server");
                    continue;
                }
            };

            // Notifications, server-initiated requests and answers to
            // abandoned requests are skipped.
            if !is_response_to(&response, id) {
                continue;
            }

            if let Some(error) = response.get("error") {
                return Err(rpc_error(method, error));
            }
            return Ok(response.get("result").cloned().unwrap_or(Value::Null));
        }
    }

    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params.unwrap_or(json!({}))
        });
        self.write_message(&notification).await
    }

    async fn write_message(&mut self, message: &Value) -> Result<()> {
        let mut encoded = serde_json::to_string(message)?;
        encoded.push('\n');
        self.stdin.write_all(encoded.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }
}

fn is_response_to(message: &Value, id: u64) -> bool {
    message.get("method").is_none() && message.get("id") == Some(&json!(id))
}

fn rpc_error(method: &str, error: &Value) -> BridgeError {
    let code = error.get("code").and_then(Value::as_i64);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");

    if code == Some(METHOD_NOT_FOUND) || message.to_lowercase().contains("not supported") {
        BridgeError::Unsupported(method.to_string())
    } else {
        BridgeError::Invocation(format!("MCP error from '{}': {}", method, message))
    }
}

#[async_trait]
impl ToolBackend for StdioBackend {
    async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let response = self.request("tools/list", None).await?;
        let tool_list: ToolListResponse = serde_json::from_value(response)?;
        Ok(tool_list.tools)
    }

    async fn list_resources(&self) -> Result<Vec<McpResource>> {
        let response = self.request("resources/list", None).await?;
        let resource_list: ResourceListResponse = serde_json::from_value(response)?;
        Ok(resource_list.resources)
    }

    async fn call_tool(&self, call: &McpToolCall) -> Result<McpToolResult> {
        let params = json!({
            "name": call.name,
            "arguments": call.arguments,
        });
        let response = self.request("tools/call", Some(params)).await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn read_resource(&self, uri: &str) -> Result<ResourceReadResponse> {
        let params = json!({ "uri": uri });
        let response = self.request("resources/read", Some(params)).await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn close(&self) -> Result<()> {
        let mut channel = self.channel.lock().await;

        // Servers that ignore shutdown get killed after the grace period.
        match timeout(SHUTDOWN_GRACE, channel.request("shutdown", None)).await {
            Ok(Ok(_)) | Ok(Err(BridgeError::Unsupported(_))) => {}
            Ok(Err(e)) => debug!(backend = %self.id, error = %e, "shutdown request failed"),
            Err(_) => debug!(backend = %self.id, "shutdown request timed out"),
        }

        if let Err(e) = channel.process.kill().await {
            warn!(backend = %self.id, error = %e, "failed to kill tool server");
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_found_maps_to_unsupported() {
        let error = json!({"code": -32601, "message": "Method not found"});
        assert!(matches!(
            rpc_error("resources/list", &error),
            BridgeError::Unsupported(m) if m == "resources/list"
        ));
    }

    #[test]
    fn test_only_matching_responses_are_accepted() {
        assert!(is_response_to(&json!({"jsonrpc": "2.0", "id": 3, "result": {}}), 3));
        assert!(!is_response_to(&json!({"jsonrpc": "2.0", "id": 2, "result": {}}), 3));
        assert!(!is_response_to(
            &json!({"jsonrpc": "2.0", "method": "notifications/progress"}),
            3
        ));
        assert!(!is_response_to(
            &json!({"jsonrpc": "2.0", "id": 3, "method": "sampling/createMessage", "params": {}}),
            3
        ));
    }

    #[test]
    fn test_other_rpc_errors_are_invocation_errors() {
        let error = json!({"code": -32000, "message": "database locked"});
        match rpc_error("tools/call", &error) {
            BridgeError::Invocation(message) => assert!(message.contains("database locked")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
