use clap::Parser;
use colored::*;
use futures::StreamExt;
use std::io::Write;
use std::process;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use toolbridge::api::OllamaClient;
use toolbridge::cli::Args;
use toolbridge::config::{self, Config, FileConfig};
use toolbridge::models::ConversationTurn;
use toolbridge::ui::{
    display_chat_result, display_error, display_history, display_models, display_resource,
    display_tools,
};
use toolbridge::{Orchestrator, Result};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = Config::from_env_and_args(&args);
    init_logging(config.as_ref().map_or(args.verbose, |c| c.verbose));

    if let Err(e) = run(args, config).await {
        display_error(&e.to_string());
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::log_directive(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args, config: Result<Config>) -> Result<()> {
    if args.config_init {
        let path = args
            .config
            .clone()
            .or_else(FileConfig::default_config_path)
            .ok_or("Could not determine home directory")?;
        FileConfig::write_example(&path)?;
        println!("{}", format!("Wrote example config to {}", path.display()).green());
        return Ok(());
    }

    let config = config?;
    let message = args.message.join(" ");

    if args.list_models {
        let client = OllamaClient::new(&config.host, None)?;
        let models = toolbridge::api::ChatModel::list_models(&client).await?;
        display_models(&models);
        return Ok(());
    }

    if args.stream {
        if message.is_empty() {
            return Err("--stream needs a message".into());
        }
        return stream_once(&config, &message).await;
    }

    let mut orchestrator = Orchestrator::from_config(&config).await?;

    let outcome = if args.list_tools {
        display_tools(orchestrator.registry());
        Ok(())
    } else if !message.is_empty() {
        let result = orchestrator.chat(&message, None).await;
        display_chat_result(&result, config.verbose);
        Ok(())
    } else {
        repl(&mut orchestrator, config.verbose).await
    };

    let failed = orchestrator.shutdown().await;
    if failed > 0 {
        warn!(failed, "some tool servers did not close cleanly");
    }
    outcome
}

/// Streams a single answer straight to stdout. No tools are involved.
async fn stream_once(config: &Config, message: &str) -> Result<()> {
    let client = OllamaClient::new(&config.host, config.request_timeout_secs.map(Duration::from_secs))?;
    let messages = vec![
        ConversationTurn::system(format!(
            "Today's date is {}.",
            Config::get_current_date()
        )),
        ConversationTurn::user(message),
    ];

    let mut stream = client.chat_stream(&config.model, &messages).await?;
    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream.next().await {
        print!("{}", chunk?);
        stdout.flush()?;
    }
    println!();
    Ok(())
}

async fn repl(orchestrator: &mut Orchestrator, verbose: bool) -> Result<()> {
    println!(
        "{}",
        format!(
            "Chatting with {} ({} tools). Type /help for commands.",
            orchestrator.model(),
            orchestrator.registry().list().len()
        )
        .dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".green());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
            match name {
                "quit" | "exit" => break,
                "help" => print_help(),
                "tools" => display_tools(orchestrator.registry()),
                "resources" => {
                    for uri in orchestrator.registry().resources() {
                        println!("{}", uri);
                    }
                }
                "read" => match orchestrator.read_resource(rest.trim()).await {
                    Ok(response) => display_resource(rest.trim(), &response),
                    Err(e) => display_error(&e.to_string()),
                },
                "history" => display_history(&orchestrator.conversation_history()),
                "clear" => {
                    orchestrator.clear_history();
                    println!("{}", "History cleared.".green());
                }
                "model" if !rest.trim().is_empty() => {
                    orchestrator.set_model(rest.trim());
                    println!("{}", format!("Using model {}", rest.trim()).green());
                }
                "model" => println!("{}", orchestrator.model()),
                "refresh" => {
                    orchestrator.refresh_tools().await;
                    display_tools(orchestrator.registry());
                }
                other => display_error(&format!("Unknown command: /{}", other)),
            }
            continue;
        }

        let result = orchestrator.chat(line, None).await;
        display_chat_result(&result, verbose);
    }

    Ok(())
}

fn print_help() {
    let commands = [
        ("/tools", "List available tools"),
        ("/resources", "List available resources"),
        ("/read <uri>", "Read a resource"),
        ("/history", "Show conversation history"),
        ("/clear", "Clear conversation history"),
        ("/model [name]", "Show or switch the model"),
        ("/refresh", "Re-discover tools from all servers"),
        ("/quit", "Exit"),
    ];
    for (command, description) in commands {
        println!("  {:<16} {}", command.cyan(), description.dimmed());
    }
}
