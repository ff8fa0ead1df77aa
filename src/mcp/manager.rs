use serde_json::Value;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::backend::ToolBackend;
use super::client::StdioBackend;
use super::types::{McpToolCall, McpToolResult, ResourceReadResponse};
use crate::config::ServerConfig;
use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Closed,
}

pub struct BackendConnection {
    id: String,
    state: ConnectionState,
    backend: Arc<dyn ToolBackend>,
}

impl BackendConnection {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn backend(&self) -> &Arc<dyn ToolBackend> {
        &self.backend
    }
}

/// Owns every backend connection, in the order they were established.
pub struct ConnectionManager {
    connections: Vec<BackendConnection>,
    tool_timeout: Option<Duration>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ConnectionManager {
    pub fn new(tool_timeout: Option<Duration>) -> Self {
        Self {
            connections: Vec::new(),
            tool_timeout,
        }
    }

    /// Launches one tool server and keeps the connection on success.
    pub async fn connect(&mut self, id: &str, server: &ServerConfig) -> Result<()> {
        debug!(backend = id, command = %server.command, state = ?ConnectionState::Connecting, "connecting");
        let backend = StdioBackend::spawn(id, server).await?;
        self.attach(id, Arc::new(backend));
        Ok(())
    }

    /// Connects every server, logging and skipping the ones that fail.
    /// Returns how many connected.
    pub async fn connect_all<'a, I>(&mut self, servers: I) -> usize
    where
        I: IntoIterator<Item = (&'a String, &'a ServerConfig)>,
    {
        let mut connected = 0;
        for (id, server) in servers {
            match self.connect(id, server).await {
                Ok(()) => connected += 1,
                Err(e) => warn!(backend = %id, error = %e, "skipping tool server"),
            }
        }
        connected
    }

    /// Registers an already-established backend. A backend with the same id
    /// is replaced and moves to the end of the connection order.
    pub fn attach(&mut self, id: &str, backend: Arc<dyn ToolBackend>) {
        self.connections.retain(|c| c.id != id);
        self.connections.push(BackendConnection {
            id: id.to_string(),
            state: ConnectionState::Connected,
            backend,
        });
        info!(backend = id, "backend connected");
    }

    pub fn get(&self, id: &str) -> Option<&BackendConnection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Open connections in connection order.
    pub fn connected(&self) -> impl Iterator<Item = &BackendConnection> {
        self.connections.iter().filter(|c| c.is_connected())
    }

    pub fn ids(&self) -> Vec<String> {
        self.connected().map(|c| c.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.connected().next().is_none()
    }

    fn open(&self, id: &str) -> Result<&BackendConnection> {
        self.get(id)
            .filter(|c| c.is_connected())
            .ok_or_else(|| BridgeError::backend_not_found(id))
    }

    pub async fn invoke(&self, id: &str, tool: &str, args: Value) -> Result<McpToolResult> {
        let connection = self.open(id)?;
        let call = McpToolCall {
            name: tool.to_string(),
            arguments: args,
        };

        let call_future = connection.backend.call_tool(&call);
        let result = match self.tool_timeout {
            Some(limit) => timeout(limit, call_future).await.map_err(|_| {
                BridgeError::Invocation(format!(
                    "Tool '{}' execution timed out after {} seconds",
                    tool,
                    limit.as_secs()
                ))
            })??,
            None => call_future.await?,
        };

        if result.is_error() {
            let message = result.joined_text();
            return Err(BridgeError::Invocation(if message.is_empty() {
                format!("Tool '{}' reported an error", tool)
            } else {
                message
            }));
        }

        Ok(result)
    }

    pub async fn read_resource(&self, id: &str, uri: &str) -> Result<ResourceReadResponse> {
        let connection = self.open(id)?;
        connection.backend.read_resource(uri).await
    }

    /// Closes every connection. Each close is attempted regardless of
    /// earlier failures; the failures are returned.
    pub async fn close_all(&mut self) -> Vec<(String, BridgeError)> {
        let mut failures = Vec::new();
        for connection in self.connections.iter_mut() {
            if connection.state == ConnectionState::Closed {
                continue;
            }
            if let Err(e) = connection.backend.close().await {
                warn!(backend = %connection.id, error = %e, "error while closing backend");
                failures.push((connection.id.clone(), e));
            }
            connection.state = ConnectionState::Closed;
        }
        failures
    }
}
