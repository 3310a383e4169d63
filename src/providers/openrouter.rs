use super::{ChatTransport, Completion, CompletionRequest, Message, Usage};
use crate::core::error::MchatError;
use crate::providers::base_client::HttpClient;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_APP_TITLE: &str = "AI Model Comparison App";

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<MessageContent>,
}

#[derive(Deserialize)]
struct MessageContent {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// OpenRouter's OpenAI-compatible chat-completion endpoint.
#[derive(Clone)]
pub struct OpenRouterTransport {
    client: HttpClient,
}

impl OpenRouterTransport {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT.to_string(), None, DEFAULT_APP_TITLE.to_string())
    }

    pub fn with_endpoint(endpoint: String, referer: Option<String>, app_title: String) -> Self {
        let mut headers = HashMap::new();
        headers.insert("X-Title".to_string(), app_title);
        if let Some(referer) = referer {
            headers.insert("HTTP-Referer".to_string(), referer);
        }

        Self {
            client: HttpClient::new(endpoint, Some(headers)),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }
}

impl Default for OpenRouterTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for OpenRouterTransport {
    async fn chat_completion(
        &self,
        credential: &str,
        request: &CompletionRequest,
    ) -> Result<Completion, MchatError> {
        let payload = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post("chat/completions", credential, &payload)
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_completion(status, &body)
    }
}

/// Turn an HTTP status and body into a completion or a descriptive error.
fn parse_completion(status: StatusCode, body: &str) -> Result<Completion, MchatError> {
    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.trim().to_string());
        return Err(MchatError::Api(format!("{}: {}", status, detail)));
    }

    let parsed: ChatCompletionResponse = serde_json::from_str(body)?;

    if let Some(error) = parsed.error {
        return Err(MchatError::Api(error.message));
    }

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content);

    Ok(Completion {
        content,
        usage: parsed.usage,
    })
}
