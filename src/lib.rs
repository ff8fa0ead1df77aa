pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod interpreter;
pub mod mcp;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod ui;

pub use error::{BridgeError, Result};
pub use orchestrator::Orchestrator;
