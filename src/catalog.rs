//! Known OpenRouter models. Any identifier may still be used as a target.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: &'static str,
    pub label: &'static str,
    pub provider: &'static str,
    pub pricing: &'static str,
}

const fn model(
    name: &'static str,
    label: &'static str,
    provider: &'static str,
) -> ModelInfo {
    ModelInfo {
        name,
        label,
        provider,
        pricing: "Free",
    }
}

pub const MODELS: &[ModelInfo] = &[
    model("meta-llama/llama-3.1-8b-instruct", "Llama 3.1 8B Instruct", "Meta"),
    model("meta-llama/llama-3.1-70b-instruct", "Llama 3.1 70B Instruct", "Meta"),
    model("mistralai/mistral-7b-instruct", "Mistral 7B Instruct", "Mistral AI"),
    model("mistralai/mistral-7b-instruct:free", "Mistral 7B Instruct (Free)", "Mistral AI"),
    model("perplexity/llama-3.1-8b-instruct", "Perplexity Llama 3.1 8B", "Perplexity"),
    model("nousresearch/nous-hermes-2-mixtral-8x7b-dpo", "Nous Hermes 2 Mixtral", "Nous Research"),
    model(
        "nousresearch/nous-hermes-2-mixtral-8x7b-dpo:free",
        "Nous Hermes 2 Mixtral (Free)",
        "Nous Research",
    ),
    model("microsoft/phi-3-mini-4k-instruct", "Phi-3 Mini 4K Instruct", "Microsoft"),
    model(
        "microsoft/phi-3-mini-4k-instruct:free",
        "Phi-3 Mini 4K Instruct (Free)",
        "Microsoft",
    ),
    model("google/gemini-2.0-flash-exp", "Gemini 2.0 Flash Exp", "Google"),
    model("google/gemini-2.0-flash-exp:free", "Gemini 2.0 Flash Exp (Free)", "Google"),
    model("anthropic/claude-3-haiku", "Claude 3 Haiku", "Anthropic"),
    model("anthropic/claude-3-haiku:free", "Claude 3 Haiku (Free)", "Anthropic"),
    model("openai/gpt-4o-mini", "GPT-4o Mini", "OpenAI"),
    model("openai/gpt-4o-mini:free", "GPT-4o Mini (Free)", "OpenAI"),
    model("deepseek/deepseek-chat", "DeepSeek Chat", "DeepSeek"),
    model("deepseek/deepseek-chat:free", "DeepSeek Chat (Free)", "DeepSeek"),
    model("qwen/qwen2.5-7b-instruct", "Qwen 2.5 7B Instruct", "Qwen"),
    model("qwen/qwen2.5-7b-instruct:free", "Qwen 2.5 7B Instruct (Free)", "Qwen"),
    model("01-ai/yi-1.5-6b-chat", "Yi 1.5 6B Chat", "01.AI"),
    model("01-ai/yi-1.5-6b-chat:free", "Yi 1.5 6B Chat (Free)", "01.AI"),
];

pub const DEFAULT_SELECTION: &[&str] = &[
    "meta-llama/llama-3.1-8b-instruct",
    "mistralai/mistral-7b-instruct",
    "anthropic/claude-3-haiku",
];

pub fn find(name: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.name == name)
}

/// Human label, or the raw identifier for models outside the catalog.
pub fn label(name: &str) -> &str {
    find(name).map(|m| m.label).unwrap_or(name)
}

pub fn default_selection() -> Vec<String> {
    DEFAULT_SELECTION.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<&str> = MODELS.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), MODELS.len());
    }

    #[test]
    fn default_selection_is_in_catalog() {
        assert!(DEFAULT_SELECTION.iter().all(|name| find(name).is_some()));
    }

    #[test]
    fn unknown_model_label_falls_back_to_name() {
        assert_eq!(label("anthropic/claude-3-haiku"), "Claude 3 Haiku");
        assert_eq!(label("acme/secret-model"), "acme/secret-model");
    }
}
