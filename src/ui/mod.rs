mod output;

pub use output::{
    display_chat_result, display_error, display_history, display_models, display_resource,
    display_tools,
};
