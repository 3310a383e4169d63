pub mod dispatcher;
pub mod handler;
pub mod registry;

use crate::store::ConversationStore;
use std::sync::Arc;

pub use dispatcher::create_command_registry;

/// What the interactive session keeps between inputs.
pub struct ChatState {
    pub models: Vec<String>,
    pub store: Arc<ConversationStore>,
    pub should_continue: bool,
}

impl ChatState {
    pub fn new(models: Vec<String>, store: Arc<ConversationStore>) -> Self {
        Self {
            models,
            store,
            should_continue: true,
        }
    }
}
