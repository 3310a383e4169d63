use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Ask several AI models the same question and compare the answers", long_about = None)]
pub struct Args {
    /// Question to send to every selected model
    pub query: Option<String>,

    /// Model to include (repeatable); defaults to the configured selection
    #[arg(short, long = "model", value_name = "MODEL")]
    pub models: Vec<String>,

    /// Start an interactive comparison session
    #[arg(short, long)]
    pub chat: bool,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Maximum tokens per answer
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Give up on a model after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// List the known models and exit
    #[arg(long)]
    pub list_models: bool,

    /// Store an OpenRouter API key in the config file and exit
    #[arg(long, value_name = "KEY")]
    pub set_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_model_flags_accumulate() {
        let args = Args::parse_from([
            "mchat",
            "why is the sky blue?",
            "-m",
            "openai/gpt-4o-mini",
            "--model",
            "deepseek/deepseek-chat",
            "--timeout",
            "20",
        ]);

        assert_eq!(args.query.as_deref(), Some("why is the sky blue?"));
        assert_eq!(args.models, ["openai/gpt-4o-mini", "deepseek/deepseek-chat"]);
        assert_eq!(args.timeout, Some(20));
        assert!(!args.chat);
    }
}
