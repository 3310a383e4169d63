use clap::Parser;
use mchat::app::Application;
use mchat::cli::Args;
use mchat::commands::create_command_registry;
use mchat::config::Config;
use mchat::display;
use mchat::{BackendClient, ConversationStore, Dispatcher, MchatError};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

async fn run() -> Result<(), MchatError> {
    let args = Args::parse();
    let mut config = Config::load()?;

    if let Some(key) = args.set_key.as_deref() {
        let key = key.trim();
        if key.is_empty() {
            return Err(MchatError::Input("API key must not be empty".to_string()));
        }
        config.api_key = Some(key.to_string());
        config.save()?;
        display::display_info(&format!("API key saved to {}", Config::config_path().display()));
        return Ok(());
    }

    let client = BackendClient::new(Arc::new(config.transport()));
    if let Some(credential) = config.credential() {
        client.configure(&credential);
    }

    let dispatcher = Dispatcher::new(client, Arc::new(ConversationStore::new()));
    let mut app = Application::new(args, config, dispatcher, create_command_registry());
    app.run().await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        display::display_error(&e.to_string());
        if matches!(e, MchatError::CredentialRequired) {
            eprintln!(
                "Set {} or run `mchat --set-key <KEY>`.",
                mchat::config::API_KEY_ENV
            );
        }
        std::process::exit(1);
    }
}
