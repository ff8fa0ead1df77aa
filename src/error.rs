use thiserror::Error;

use crate::interpreter::ParseError;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Backend process could not be launched or failed the handshake.
    #[error("Connection error ({backend}): {message}")]
    Connection { backend: String, message: String },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// Backend rejected the call, returned an error result, or timed out.
    #[error("{0}")]
    Invocation(String),

    /// JSON-RPC method the backend does not implement.
    #[error("Method '{0}' not supported by backend")]
    Unsupported(String),

    #[error("Model error (status {status}): {message}")]
    Model { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

impl BridgeError {
    pub fn connection(backend: impl Into<String>, message: impl ToString) -> Self {
        Self::Connection {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Tool",
            name: name.into(),
        }
    }

    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Resource",
            name: uri.into(),
        }
    }

    pub fn backend_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Backend",
            name: id.into(),
        }
    }
}

impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        BridgeError::Config(format!("{:#}", err))
    }
}

impl From<String> for BridgeError {
    fn from(msg: String) -> Self {
        BridgeError::Other(msg)
    }
}

impl From<&str> for BridgeError {
    fn from(msg: &str) -> Self {
        BridgeError::Other(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
