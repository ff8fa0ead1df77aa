mod defaults;
mod prompts;
mod servers;
mod validation;

use crate::cli::Args;
use crate::error::{BridgeError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use defaults::{
    DEFAULT_FOLLOW_UP_TEMPLATE, DEFAULT_MODEL, DEFAULT_OLLAMA_HOST, DEFAULT_SYSTEM_PROMPT,
    TOOL_RESULT_PLACEHOLDER,
};
pub use prompts::PromptConfig;
pub use servers::ServerConfig;
pub use validation::{expand_env_var_in_string, expand_env_vars};

use defaults::{default_enabled, default_history_turns, default_tool_timeout};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OllamaConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            timeout_secs: default_tool_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_turns")]
    pub max_turns: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: default_history_turns(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub verbose: Option<bool>,
}

/// On-disk configuration, YAML or JSON.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub prompts: PromptConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
}

/// Fully resolved settings: CLI args > env vars > config file > defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub model: String,
    pub request_timeout_secs: Option<u64>,
    pub prompts: PromptConfig,
    pub servers: BTreeMap<String, ServerConfig>,
    pub tools_enabled: bool,
    pub tool_timeout_secs: u64,
    pub history_turns: usize,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file_config(FileConfig::default())
    }
}

impl Config {
    pub fn from_env_and_args(args: &Args) -> Result<Self> {
        let file_config = match &args.config {
            Some(path) => FileConfig::load_from(path)?,
            None => FileConfig::load()?,
        };

        let mut config = Self::from_file_config(file_config);

        if let Ok(host) = env::var("OLLAMA_HOST") {
            config.host = normalize_host(&host);
        }
        if let Some(host) = &args.host {
            config.host = normalize_host(host);
        }

        if let Ok(model) = env::var("TOOLBRIDGE_MODEL") {
            config.model = model;
        }
        if let Some(model) = &args.model {
            config.model = model.clone();
        }

        if let Ok(prompt) = env::var("TOOLBRIDGE_SYSTEM_PROMPT") {
            config.prompts.system = prompt;
        }

        if let Some(timeout) = env::var("TOOLBRIDGE_TOOL_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.tool_timeout_secs = timeout;
        }

        if let Ok(v) = env::var("TOOLBRIDGE_VERBOSE") {
            config.verbose = matches!(v.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        config.verbose |= args.verbose;

        if args.no_tools {
            config.tools_enabled = false;
        }

        if config.model.trim().is_empty() {
            return Err(BridgeError::Config("model name must not be empty".to_string()));
        }

        Ok(config)
    }

    pub fn from_file_config(file: FileConfig) -> Self {
        Self {
            host: file
                .ollama
                .host
                .as_deref()
                .map(normalize_host)
                .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            model: file
                .ollama
                .default_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            request_timeout_secs: file.ollama.request_timeout_secs,
            prompts: file.prompts,
            servers: file.servers,
            tools_enabled: file.tools.enabled,
            tool_timeout_secs: file.tools.timeout_secs,
            history_turns: file.history.max_turns,
            verbose: file.session.verbose.unwrap_or(false),
        }
    }

    /// Servers that should be launched, in name order.
    pub fn enabled_servers(&self) -> impl Iterator<Item = (&String, &ServerConfig)> {
        self.servers.iter().filter(|(_, server)| server.enabled)
    }

    pub fn get_current_date() -> String {
        chrono::Local::now().format("%A, %B %d, %Y").to_string()
    }
}

/// `tracing` filter used when `RUST_LOG` is not set.
pub fn log_directive(verbose: bool) -> &'static str {
    if verbose {
        "toolbridge=debug"
    } else {
        "toolbridge=warn"
    }
}

/// Accepts `localhost:11434`, `http://host:port/` and friends.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

impl FileConfig {
    pub fn load() -> Result<Self> {
        for path in Self::get_config_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(FileConfig::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_json = path.extension().and_then(|s| s.to_str()) == Some("json");
        let config = if is_json {
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config file: {}", path.display()))?
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))?
        };

        Ok(config)
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".toolbridge.yaml"),
            PathBuf::from(".toolbridge.yml"),
            PathBuf::from(".toolbridge.json"),
        ];

        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("toolbridge");
            paths.push(config_dir.join("config.yaml"));
            paths.push(config_dir.join("config.yml"));
            paths.push(config_dir.join("config.json"));
        }

        paths
    }

    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("toolbridge").join("config.yaml"))
    }

    /// Example configuration with two tool servers.
    pub fn example() -> Self {
        let mut weather = ServerConfig::new("node", vec!["servers/weather.js".to_string()]);
        weather
            .env
            .insert("WEATHER_API_KEY".to_string(), "${WEATHER_API_KEY}".to_string());

        let mut servers = BTreeMap::new();
        servers.insert("weather".to_string(), weather);
        servers.insert(
            "sqlite".to_string(),
            ServerConfig::new(
                "uvx",
                vec![
                    "mcp-server-sqlite".to_string(),
                    "--db-path".to_string(),
                    "./chat.db".to_string(),
                ],
            ),
        );

        Self {
            ollama: OllamaConfig {
                host: Some(DEFAULT_OLLAMA_HOST.to_string()),
                default_model: Some(DEFAULT_MODEL.to_string()),
                request_timeout_secs: None,
            },
            servers,
            ..Self::default()
        }
    }

    /// Writes the example config to `path`, refusing to overwrite.
    pub fn write_example(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(BridgeError::Config(format!(
                "config file already exists: {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_yaml::to_string(&Self::example())?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("localhost:11434"), "http://localhost:11434");
        assert_eq!(normalize_host("http://gpu-box:11434/"), "http://gpu-box:11434");
        assert_eq!(normalize_host("https://ollama.example"), "https://ollama.example");
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let file: FileConfig = serde_yaml::from_str("servers: {}").unwrap();
        let config = Config::from_file_config(file);

        assert_eq!(config.host, DEFAULT_OLLAMA_HOST);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.history_turns, 20);
        assert_eq!(config.tool_timeout_secs, 30);
        assert!(config.tools_enabled);
        assert!(config.prompts.follow_up.contains(TOOL_RESULT_PLACEHOLDER));
    }

    #[test]
    fn test_disabled_servers_are_skipped() {
        let yaml = r#"
servers:
  weather:
    command: node
    args: ["weather.js"]
  logger:
    command: python3
    enabled: false
"#;
        let file: FileConfig = serde_yaml::from_str(yaml).unwrap();
        let config = Config::from_file_config(file);

        let names: Vec<&String> = config.enabled_servers().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["weather"]);
    }
}
