use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "toolbridge")]
#[command(about = "Chat with a local Ollama model that can call MCP tool servers", long_about = None)]
pub struct Args {
    #[arg(short = 'm', long = "model", help = "Model to use (overrides config)")]
    pub model: Option<String>,

    #[arg(long = "host", help = "Ollama host (e.g., http://localhost:11434)")]
    pub host: Option<String>,

    #[arg(short = 'c', long = "config", help = "Path to a YAML or JSON config file")]
    pub config: Option<PathBuf>,

    #[arg(
        long = "stream",
        help = "Stream the model's answer directly, without tool calling"
    )]
    pub stream: bool,

    #[arg(long = "no-tools", help = "Do not launch or offer any tool servers")]
    pub no_tools: bool,

    #[arg(long = "list-models", help = "List models available on the Ollama host")]
    pub list_models: bool,

    #[arg(long = "list-tools", help = "Connect to tool servers and list their tools")]
    pub list_tools: bool,

    #[arg(
        long = "config-init",
        help = "Write an example config file to ~/.config/toolbridge/config.yaml"
    )]
    pub config_init: bool,

    #[arg(short = 'v', long = "verbose", help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(help = "Message to send; starts an interactive session when omitted")]
    pub message: Vec<String>,
}
