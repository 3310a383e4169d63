use crate::catalog;
use crate::cli::Args;
use crate::client::RequestParams;
use crate::commands::{ChatState, dispatcher::CommandDispatcher};
use crate::config::Config;
use crate::core::error::MchatError;
use crate::dispatcher::Dispatcher;
use crate::display;
use crate::input;
use crate::store::{ConversationStore, StoreEvent};
use console::style;
use is_terminal::IsTerminal;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub struct Application {
    pub args: Args,
    pub config: Config,
    pub dispatcher: Dispatcher,
    pub command_dispatcher: CommandDispatcher,
}

impl Application {
    pub fn new(
        args: Args,
        config: Config,
        dispatcher: Dispatcher,
        command_dispatcher: CommandDispatcher,
    ) -> Self {
        Self {
            args,
            config,
            dispatcher,
            command_dispatcher,
        }
    }

    fn selected_models(&self) -> Vec<String> {
        if self.args.models.is_empty() {
            self.config.models.clone()
        } else {
            self.args.models.clone()
        }
    }

    fn request_params(&self) -> RequestParams {
        let mut params = self.config.request_params();
        if let Some(temperature) = self.args.temperature {
            params.temperature = temperature;
        }
        if let Some(max_tokens) = self.args.max_tokens {
            params.max_tokens = max_tokens;
        }
        if let Some(secs) = self.args.timeout {
            params.timeout = Some(Duration::from_secs(secs));
        }
        params
    }

    pub async fn run(&mut self) -> Result<(), MchatError> {
        if self.args.list_models {
            display::display_catalog(catalog::MODELS, &self.selected_models());
            return Ok(());
        }

        if self.args.chat {
            self.handle_chat_mode().await
        } else {
            self.handle_single_query().await
        }
    }

    async fn handle_single_query(&self) -> Result<(), MchatError> {
        let context = if !io::stdin().is_terminal() {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| MchatError::Input(format!("Failed to read from stdin: {}", e)))?;
            Some(buffer)
        } else {
            None
        };

        let query = match (self.args.query.as_deref(), context) {
            (Some(q), Some(piped)) => format!("{}\n\n{}", piped.trim_end(), q),
            (None, Some(piped)) => piped,
            (Some(q), None) => q.to_string(),
            (None, None) => {
                return Err(MchatError::Input(
                    "No query provided (pass one, pipe one in, or use --chat)".to_string(),
                ));
            }
        };

        let models = self.selected_models();
        self.compare(&models, &query).await
    }

    /// Run one round and print every panel once all models have settled.
    async fn compare(&self, models: &[String], query: &str) -> Result<(), MchatError> {
        display::display_info(&format!("Asking {} models...", models.len()));

        let progress = watch_progress(Arc::clone(self.dispatcher.store()), models.to_vec());
        let result = self
            .dispatcher
            .send_to_targets(models, query, self.request_params())
            .await;
        progress.abort();

        let report = result?;
        display::display_comparison(models, &self.dispatcher.store().get_all());
        display::display_report(&report);
        Ok(())
    }

    async fn handle_chat_mode(&mut self) -> Result<(), MchatError> {
        let mut state = ChatState::new(
            self.selected_models(),
            Arc::clone(self.dispatcher.store()),
        );

        println!(
            "Comparing {} models. Type '/help' for available commands. Press Ctrl+D or type /quit to exit.",
            state.models.len()
        );

        let mut editor = input::create_editor(self.command_dispatcher.clone())?;

        loop {
            let input = match input::read_input(&mut editor)? {
                Some(input) => input.trim().to_string(),
                None => break,
            };

            if input.is_empty() {
                continue;
            }

            if let Some(command_line) = input.strip_prefix('/') {
                let parts: Vec<&str> = command_line.split_whitespace().collect();
                if let Some((command, args)) = parts.split_first() {
                    match self.command_dispatcher.execute(command, args, &mut state) {
                        Ok(Some(output)) => println!("{}", output),
                        Ok(None) => {}
                        Err(e) => display::display_error(&e.to_string()),
                    }

                    if !state.should_continue {
                        break;
                    }
                }
                continue;
            }

            // Per-round failures are shown and the session keeps going.
            if let Err(e) = self.compare(&state.models, &input).await {
                display::display_error(&e.to_string());
            }
        }

        input::save_history(&mut editor)?;

        Ok(())
    }
}

/// Print a line as each model of the round settles.
fn watch_progress(store: Arc<ConversationStore>, models: Vec<String>) -> JoinHandle<()> {
    let mut events = store.subscribe();
    tokio::spawn(async move {
        let mut pending = models;
        while !pending.is_empty() {
            let target = match events.recv().await {
                Ok(StoreEvent::Changed(target)) => target,
                Ok(StoreEvent::Cleared) => break,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            let Some(snapshot) = store.get(&target) else {
                continue;
            };
            if snapshot.loading {
                continue;
            }
            if let Some(index) = pending.iter().position(|m| *m == target) {
                pending.swap_remove(index);
                let marker = if snapshot.error.is_some() {
                    style("✘").red()
                } else {
                    style("✔").green()
                };
                println!("  {} {}", marker, catalog::label(&target));
            }
        }
    })
}
