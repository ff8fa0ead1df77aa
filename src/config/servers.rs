use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::defaults::{default_enabled, is_default_enabled};

/// How to launch one tool server subprocess.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Values support ${VAR} expansion at launch time.
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_enabled", skip_serializing_if = "is_default_enabled")]
    pub enabled: bool,
}

impl ServerConfig {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: HashMap::new(),
            enabled: true,
        }
    }
}
