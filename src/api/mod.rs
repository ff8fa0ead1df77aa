pub mod client;
pub mod models;
pub mod response;
pub mod streaming;

pub use client::{ChatModel, OllamaClient};
pub use models::{ChatRequest, ModelInfo};
pub use streaming::ChatStream;
