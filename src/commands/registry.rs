use crate::commands::ChatState;
use crate::commands::handler::CommandHandler;
use crate::core::error::MchatError;
use std::sync::Arc;

type SharedHandler = Arc<dyn CommandHandler + Send + Sync>;

/// Slash commands of a comparison session, in the order they were registered.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: Vec<(String, SharedHandler)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `command` under `name`, replacing an earlier one with that name.
    pub fn register<C: CommandHandler + Send + Sync + 'static>(&mut self, name: &str, command: C) {
        let handler: SharedHandler = Arc::new(command);
        match self.handlers.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = handler,
            None => self.handlers.push((name.to_string(), handler)),
        }
    }

    pub fn execute(
        &self,
        name: &str,
        args: &[&str],
        state: &mut ChatState,
    ) -> Result<Option<String>, MchatError> {
        let (_, handler) = self
            .handlers
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| {
                MchatError::Input(format!(
                    "Unknown command: /{} (type /help for session commands)",
                    name
                ))
            })?;
        handler.execute(state, args)
    }

    /// One usage line per registered command.
    pub fn usage_lines(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|(_, h)| h.help()).collect()
    }

    pub fn get_command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.iter().map(|(n, _)| n.clone()).collect();
        names.sort();
        names
    }
}
