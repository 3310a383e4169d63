use super::ChatState;
use crate::catalog;
use crate::core::error::MchatError;

use console::style;

pub trait CommandHandler {
    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, MchatError>;
    fn help(&self) -> &'static str;
}

pub struct QuitCommand;
pub struct ClearCommand;
pub struct ModelsCommand;
pub struct UsageCommand;

impl CommandHandler for QuitCommand {
    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, MchatError> {
        state.should_continue = false;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/quit - Exit the comparison session"
    }
}

/// Lists the commands registered before it, followed by itself.
pub struct HelpCommand {
    lines: Vec<&'static str>,
}

impl HelpCommand {
    pub fn new(lines: Vec<&'static str>) -> Self {
        Self { lines }
    }
}

impl CommandHandler for HelpCommand {
    fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, MchatError> {
        let mut help_text = vec![
            style("Session commands").bold().underlined().to_string(),
            format!(
                "Anything else is sent to all {} selected models.",
                state.models.len()
            ),
        ];
        help_text.extend(self.lines.iter().map(|line| line.to_string()));
        help_text.push(self.help().to_string());

        Ok(Some(help_text.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/help - Show available commands"
    }
}

impl CommandHandler for ClearCommand {
    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, MchatError> {
        match args.first() {
            Some(model) => {
                state.store.clear(model);
                Ok(Some(format!("Cleared conversation with {}.", catalog::label(model))))
            }
            None => {
                state.store.clear_all();
                Ok(Some("All conversations cleared.".to_string()))
            }
        }
    }

    fn help(&self) -> &'static str {
        "/clear [model] - Clear one conversation, or all of them"
    }
}

impl CommandHandler for ModelsCommand {
    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, MchatError> {
        if args.is_empty() {
            let lines: Vec<String> = state
                .models
                .iter()
                .map(|m| format!("  {} ({})", catalog::label(m), style(m).dim()))
                .collect();
            return Ok(Some(format!("Comparing:\n{}", lines.join("\n"))));
        }

        let mut models: Vec<String> = Vec::new();
        for model in args {
            if !models.iter().any(|m| m == model) {
                models.push(model.to_string());
            }
        }
        let unknown: Vec<&str> = models
            .iter()
            .filter(|m| catalog::find(m).is_none())
            .map(String::as_str)
            .collect();

        let mut message = format!("Now comparing {} models.", models.len());
        if !unknown.is_empty() {
            message.push_str(&format!(
                "\n{} not in the catalog: {}",
                style("note:").yellow(),
                unknown.join(", ")
            ));
        }
        state.models = models;
        Ok(Some(message))
    }

    fn help(&self) -> &'static str {
        "/models [model...] - Show or replace the models being compared"
    }
}

impl CommandHandler for UsageCommand {
    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, MchatError> {
        let mut lines = Vec::new();
        for model in &state.models {
            let usage = state.store.get(model).and_then(|s| s.usage);
            let line = match usage {
                Some(u) => format!(
                    "  {}: {} prompt + {} completion = {} tokens",
                    catalog::label(model),
                    u.prompt_tokens,
                    u.completion_tokens,
                    u.total_tokens
                ),
                None => format!("  {}: no usage reported", catalog::label(model)),
            };
            lines.push(line);
        }

        if lines.is_empty() {
            Ok(Some("No models selected.".to_string()))
        } else {
            Ok(Some(format!("Last response usage:\n{}", lines.join("\n"))))
        }
    }

    fn help(&self) -> &'static str {
        "/usage - Show token usage of the latest answers"
    }
}
