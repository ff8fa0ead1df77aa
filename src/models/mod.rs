mod chat;
mod message;
mod tool;

pub use chat::ChatResult;
pub use message::{ConversationTurn, Role};
pub use tool::{ResourceDescriptor, ToolDescriptor, ToolInvocationRequest};
