use colored::*;

use crate::api::ModelInfo;
use crate::mcp::ResourceReadResponse;
use crate::models::{ChatResult, ConversationTurn, Role};
use crate::registry::ToolRegistry;

/// Display a tool result in a boxed format
fn display_tool_block(name: &str, result: &str) {
    // Avoid double newline if result already ends with one
    let sep = if result.ends_with('\n') { "" } else { "\n" };
    println!("{}", format!("```TOOL: {}", name).dimmed());
    print!("{}{}", result.dimmed(), sep);
    println!("{}", "```".dimmed());
}

pub fn display_chat_result(result: &ChatResult, verbose: bool) {
    match result {
        ChatResult::Direct { response } => println!("{}", response),
        ChatResult::ToolAugmented {
            tool_used,
            tool_result,
            final_response,
            raw_response,
        } => {
            if verbose {
                println!("{}", format!("[model] {}", raw_response).dimmed());
                display_tool_block(tool_used, &tool_result.to_string());
            } else {
                println!("{}", format!("Used tool: {}", tool_used).cyan());
            }
            println!("{}", final_response);
        }
        ChatResult::Failed {
            error,
            raw_response,
        } => {
            if verbose {
                if let Some(raw) = raw_response {
                    println!("{}", format!("[model] {}", raw).dimmed());
                }
            }
            display_error(error);
        }
    }
}

pub fn display_error(error: &str) {
    eprintln!("{} {}", "Error:".red(), error);
}

pub fn display_tools(registry: &ToolRegistry) {
    let mut any = false;
    for tool in registry.tools() {
        any = true;
        println!(
            "{} {} {}",
            tool.name.cyan(),
            format!("({})", tool.backend).dimmed(),
            tool.description
        );
    }
    if !any {
        println!("{}", "No tools available.".dimmed());
    }
}

pub fn display_resource(uri: &str, response: &ResourceReadResponse) {
    println!("{}", uri.cyan());
    for content in &response.contents {
        match (&content.text, &content.blob) {
            (Some(text), _) => println!("{}", text),
            (None, Some(blob)) => println!("{}", format!("<binary, {} bytes base64>", blob.len()).dimmed()),
            (None, None) => println!("{}", "<empty>".dimmed()),
        }
    }
}

pub fn display_history(turns: &[ConversationTurn]) {
    for turn in turns {
        let label = match turn.role {
            Role::System => "system".dimmed(),
            Role::User => "user".green(),
            Role::Assistant => "assistant".cyan(),
        };
        println!("{}: {}", label, turn.content);
    }
}

pub fn display_models(models: &[ModelInfo]) {
    for model in models {
        match model.size {
            Some(size) => println!(
                "{} {}",
                model.name,
                format!("({:.1} GB)", size as f64 / 1_000_000_000.0).dimmed()
            ),
            None => println!("{}", model.name),
        }
    }
}
