use super::{
    ChatState,
    handler::{ClearCommand, HelpCommand, ModelsCommand, QuitCommand, UsageCommand},
    registry::CommandRegistry,
};
use crate::core::error::MchatError;
use std::sync::Arc;

/// Routes `/name args...` typed between comparison rounds.
#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub fn execute(
        &self,
        command: &str,
        args: &[&str],
        state: &mut ChatState,
    ) -> Result<Option<String>, MchatError> {
        self.registry.execute(command, args, state)
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.registry.get_command_names()
    }
}

/// Session commands: manage the model selection and per-model history, then
/// `/help` listing all of them.
pub fn create_command_registry() -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register("models", ModelsCommand);
    registry.register("clear", ClearCommand);
    registry.register("usage", UsageCommand);
    registry.register("quit", QuitCommand);

    let help = HelpCommand::new(registry.usage_lines());
    registry.register("help", help);

    CommandDispatcher::new(Arc::new(registry))
}
