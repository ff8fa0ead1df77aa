use std::fs;
use tempfile::TempDir;

use toolbridge::cli::Args;
use toolbridge::config::{log_directive, Config, FileConfig};
use toolbridge::BridgeError;

#[test]
fn test_load_yaml_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    fs::write(
        &path,
        r#"
ollama:
  host: gpu-box:11434
  default_model: llama3.1:8b
prompts:
  follow_up: "Result: {TOOL_RESULT}"
tools:
  timeout_secs: 10
history:
  max_turns: 6
servers:
  weather:
    command: node
    args: ["weather.js"]
    env:
      API_KEY: "${WEATHER_KEY}"
"#,
    )
    .unwrap();

    let config = Config::from_file_config(FileConfig::load_from(&path).unwrap());

    assert_eq!(config.host, "http://gpu-box:11434");
    assert_eq!(config.model, "llama3.1:8b");
    assert_eq!(config.tool_timeout_secs, 10);
    assert_eq!(config.history_turns, 6);
    assert_eq!(config.prompts.render_follow_up("42"), "Result: 42");
    assert_eq!(config.servers["weather"].env["API_KEY"], "${WEATHER_KEY}");
}

#[test]
fn test_load_json_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(
        &path,
        r#"{"servers": {"sqlite": {"command": "uvx", "args": ["mcp-server-sqlite"], "enabled": false}}}"#,
    )
    .unwrap();

    let config = Config::from_file_config(FileConfig::load_from(&path).unwrap());

    assert_eq!(config.servers.len(), 1);
    assert_eq!(config.enabled_servers().count(), 0);
}

#[test]
fn test_malformed_config_is_a_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    fs::write(&path, "servers: [not, a, map]").unwrap();

    let err = FileConfig::load_from(&path).unwrap_err();

    assert!(matches!(err, BridgeError::Config(_)));
    assert!(err.to_string().contains("Failed to parse YAML config file"));
}

#[test]
fn test_write_example_round_trips_and_refuses_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.yaml");

    FileConfig::write_example(&path).unwrap();
    let loaded = FileConfig::load_from(&path).unwrap();
    assert!(loaded.servers.contains_key("weather"));
    assert!(loaded.servers.contains_key("sqlite"));

    assert!(FileConfig::write_example(&path).is_err());
}

#[test]
fn test_cli_flags_override_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    fs::write(&path, "ollama:\n  host: http://file-host:11434\n  default_model: from-file\n").unwrap();

    let args = Args {
        config: Some(path),
        host: Some("cli-host:11434".to_string()),
        model: Some("from-cli".to_string()),
        no_tools: true,
        ..Args::default()
    };
    let config = Config::from_env_and_args(&args).unwrap();

    assert_eq!(config.host, "http://cli-host:11434");
    assert_eq!(config.model, "from-cli");
    assert!(!config.tools_enabled);
}

#[test]
fn test_file_verbose_raises_log_level() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    fs::write(&path, "session:\n  verbose: true\n").unwrap();

    let args = Args {
        config: Some(path),
        ..Args::default()
    };
    let config = Config::from_env_and_args(&args).unwrap();

    assert!(config.verbose);
    assert_eq!(log_directive(config.verbose), "toolbridge=debug");
    assert_eq!(log_directive(false), "toolbridge=warn");
}
