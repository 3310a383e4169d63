use crate::core::error::MchatError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod base_client;
pub mod openrouter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Token accounting reported by the upstream for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One chat-completion call as handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Raw upstream answer. `content` is `None` when the backend produced no text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    pub usage: Option<Usage>,
}

/// A chat-completion endpoint. Implementations perform the I/O and report
/// failures as errors; normalization into outcomes happens in the client.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn chat_completion(
        &self,
        credential: &str,
        request: &CompletionRequest,
    ) -> Result<Completion, MchatError>;
}
