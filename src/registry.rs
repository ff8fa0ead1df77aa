//! Merged view of the tool and resource catalogs of all connected backends.
//!
//! The registry is rebuilt from scratch on every refresh. Backends are
//! visited in connection order, so when two backends expose the same tool
//! name the one discovered last owns the plain name; every backend's own
//! catalog is still kept for pinned lookups.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use crate::mcp::{ConnectionManager, McpResource, McpTool, ToolBackend};
use crate::models::{ResourceDescriptor, ToolDescriptor};

/// Everything one backend reported during discovery.
#[derive(Debug, Clone, Default)]
pub struct BackendCatalog {
    pub backend: String,
    pub tools: Vec<ToolDescriptor>,
    pub resources: Vec<ResourceDescriptor>,
}

impl BackendCatalog {
    pub fn from_discovery(backend: &str, tools: Vec<McpTool>, resources: Vec<McpResource>) -> Self {
        Self {
            backend: backend.to_string(),
            tools: tools
                .into_iter()
                .map(|tool| ToolDescriptor {
                    name: tool.name,
                    backend: backend.to_string(),
                    description: tool.description.unwrap_or_default(),
                    input_schema: tool.input_schema,
                })
                .collect(),
            resources: resources
                .into_iter()
                .map(|resource| ResourceDescriptor {
                    uri: resource.uri,
                    backend: backend.to_string(),
                    name: resource.name,
                    description: resource.description,
                    mime_type: resource.mime_type,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    catalogs: Vec<BackendCatalog>,
    tools: BTreeMap<String, ToolDescriptor>,
    resources: BTreeMap<String, ResourceDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-discovers every connected backend and replaces the registry
    /// contents. Failures are logged per backend and never abort the refresh.
    pub async fn refresh(&mut self, connections: &ConnectionManager) {
        let mut catalogs = Vec::new();
        for connection in connections.connected() {
            match discover(connection.id(), connection.backend().as_ref()).await {
                Ok(catalog) => catalogs.push(catalog),
                Err(e) => warn!(backend = %connection.id(), error = %e, "tool discovery failed"),
            }
        }
        self.rebuild(catalogs);
        info!(
            tools = self.tools.len(),
            resources = self.resources.len(),
            "tool registry refreshed"
        );
    }

    /// Replaces all contents with `catalogs`, later catalogs winning name
    /// collisions.
    pub fn rebuild(&mut self, catalogs: Vec<BackendCatalog>) {
        let mut tools = BTreeMap::new();
        let mut resources = BTreeMap::new();

        for catalog in &catalogs {
            for tool in &catalog.tools {
                if let Some(previous) = tools.insert(tool.name.clone(), tool.clone()) {
                    debug!(
                        tool = %tool.name,
                        previous = %previous.backend,
                        current = %tool.backend,
                        "tool name collision, latest backend wins"
                    );
                }
            }
            for resource in &catalog.resources {
                resources.insert(resource.uri.clone(), resource.clone());
            }
        }

        self.catalogs = catalogs;
        self.tools = tools;
        self.resources = resources;
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor> {
        self.tools
            .get(name)
            .ok_or_else(|| BridgeError::tool_not_found(name))
    }

    /// Like `resolve`, but only looks at `backend`'s own catalog.
    pub fn resolve_on(&self, name: &str, backend: &str) -> Result<&ToolDescriptor> {
        self.catalog(backend)
            .and_then(|catalog| catalog.tools.iter().find(|tool| tool.name == name))
            .ok_or_else(|| BridgeError::tool_not_found(format!("{}/{}", backend, name)))
    }

    pub fn resolve_resource(&self, uri: &str) -> Result<&ResourceDescriptor> {
        self.resources
            .get(uri)
            .ok_or_else(|| BridgeError::resource_not_found(uri))
    }

    /// All tool names, sorted.
    pub fn list(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn list_by_backend(&self, backend: &str) -> Vec<String> {
        self.catalog(backend)
            .map(|catalog| catalog.tools.iter().map(|tool| tool.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// All resource URIs, sorted.
    pub fn resources(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }

    pub fn resources_by_backend(&self, backend: &str) -> Vec<String> {
        self.catalog(backend)
            .map(|catalog| catalog.resources.iter().map(|r| r.uri.clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.resources.is_empty()
    }

    fn catalog(&self, backend: &str) -> Option<&BackendCatalog> {
        self.catalogs.iter().find(|catalog| catalog.backend == backend)
    }
}

/// Asks one backend for its catalogs. Resource listing is best effort:
/// "unsupported" is expected and silent, anything else is logged.
pub async fn discover(backend_id: &str, backend: &dyn ToolBackend) -> Result<BackendCatalog> {
    let tools = backend.list_tools().await?;

    let resources = match backend.list_resources().await {
        Ok(resources) => resources,
        Err(BridgeError::Unsupported(_)) => Vec::new(),
        Err(e) => {
            warn!(backend = backend_id, error = %e, "resource listing failed");
            Vec::new()
        }
    };

    debug!(
        backend = backend_id,
        tools = tools.len(),
        resources = resources.len(),
        "discovered catalog"
    );
    Ok(BackendCatalog::from_discovery(backend_id, tools, resources))
}
