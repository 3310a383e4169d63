use crate::core::error::MchatError;
use crate::providers::{ChatTransport, CompletionRequest, Message, Usage};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Sampling knobs applied to every call of one round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestParams {
    pub temperature: f64,
    pub max_tokens: u32,
    /// No limit when `None`; a stuck call then stays pending.
    pub timeout: Option<Duration>,
}

impl Default for RequestParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: None,
        }
    }
}

impl RequestParams {
    pub fn validate(&self) -> Result<(), MchatError> {
        if !self.temperature.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(MchatError::Input(format!(
                "temperature must be between 0.0 and {}, got {}",
                MAX_TEMPERATURE, self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(MchatError::Input(
                "max_tokens must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Normalized result of one backend call: a reply or an error description.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub target: String,
    pub result: Result<Reply, String>,
}

impl Outcome {
    pub fn success(target: impl Into<String>, reply: Reply) -> Self {
        Self {
            target: target.into(),
            result: Ok(reply),
        }
    }

    pub fn failure(target: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            result: Err(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Empty on failure.
    pub fn content(&self) -> &str {
        self.result.as_ref().map(|r| r.content.as_str()).unwrap_or("")
    }

    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }
}

/// Issues chat-completion calls with one shared credential.
///
/// Cloning is cheap and clones share the credential slot, so a later
/// `configure` is seen by every clone.
#[derive(Clone)]
pub struct BackendClient {
    transport: Arc<dyn ChatTransport>,
    credential: Arc<RwLock<Option<String>>>,
}

impl BackendClient {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            credential: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_credential(transport: Arc<dyn ChatTransport>, credential: &str) -> Self {
        let client = Self::new(transport);
        client.configure(credential);
        client
    }

    /// Replace the credential. Blank input leaves the client unconfigured.
    pub fn configure(&self, credential: &str) {
        let credential = credential.trim();
        let value = (!credential.is_empty()).then(|| credential.to_string());
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }

    pub fn is_configured(&self) -> bool {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn credential(&self) -> Option<String> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Perform one call. Every failure is folded into the returned outcome.
    pub async fn send(&self, target: &str, envelope: &[Message], params: RequestParams) -> Outcome {
        match self.try_send(target, envelope, params).await {
            Ok(reply) => {
                debug!(model = %target, chars = reply.content.len(), "response received");
                Outcome::success(target, reply)
            }
            Err(err) => {
                warn!(model = %target, error = %err, "request failed");
                Outcome::failure(target, err.reason())
            }
        }
    }

    async fn try_send(
        &self,
        target: &str,
        envelope: &[Message],
        params: RequestParams,
    ) -> Result<Reply, MchatError> {
        let credential = self.credential().ok_or(MchatError::CredentialRequired)?;

        if target.trim().is_empty() {
            return Err(MchatError::Input("target must not be empty".to_string()));
        }
        if envelope.is_empty() {
            return Err(MchatError::Input(
                "envelope must contain at least one message".to_string(),
            ));
        }
        params.validate()?;

        let request = CompletionRequest {
            model: target.to_string(),
            messages: envelope.to_vec(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let call = self.transport.chat_completion(&credential, &request);
        let completion = match params.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| MchatError::Network("request timed out".to_string()))??,
            None => call.await?,
        };

        let content = completion
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| MchatError::Api("No response received from model".to_string()))?;

        Ok(Reply {
            content,
            usage: completion.usage,
        })
    }

    /// Call every distinct target concurrently and wait for all of them.
    pub async fn send_to_many(
        &self,
        targets: &[String],
        envelope: &[Message],
        params: RequestParams,
    ) -> HashMap<String, Outcome> {
        self.send_to_many_with(targets, envelope, params, |_| {})
            .await
    }

    /// Like [`send_to_many`](Self::send_to_many), handing each outcome to
    /// `on_settled` as soon as its call finishes.
    pub async fn send_to_many_with<F>(
        &self,
        targets: &[String],
        envelope: &[Message],
        params: RequestParams,
        mut on_settled: F,
    ) -> HashMap<String, Outcome>
    where
        F: FnMut(&Outcome),
    {
        let envelope: Arc<[Message]> = envelope.into();
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();

        for target in distinct(targets) {
            let client = self.clone();
            let envelope = Arc::clone(&envelope);
            let model = target.clone();
            let handle = tasks.spawn(async move { client.send(&model, &envelope, params).await });
            pending.insert(handle.id(), target);
        }

        let mut outcomes = HashMap::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            let outcome = match joined {
                Ok((id, outcome)) => {
                    pending.remove(&id);
                    outcome
                }
                Err(err) => {
                    let Some(target) = pending.remove(&err.id()) else {
                        continue;
                    };
                    warn!(model = %target, error = %err, "request task aborted");
                    Outcome::failure(target, format!("Request failed: {}", err))
                }
            };
            on_settled(&outcome);
            outcomes.insert(outcome.target.clone(), outcome);
        }

        outcomes
    }
}

/// Targets in first-seen order with duplicates removed.
pub(crate) fn distinct(targets: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use tokio::time::Instant;

    fn envelope() -> Vec<Message> {
        vec![Message::system("be brief"), Message::user("hello")]
    }

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn unconfigured_client_fails_without_calling_transport() {
        let transport = Arc::new(ScriptedTransport::new().reply("a", 0, "hi"));
        let client = BackendClient::new(transport.clone());

        let outcome = client.send("a", &envelope(), RequestParams::default()).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.content(), "");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn blank_credential_leaves_client_unconfigured() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = BackendClient::with_credential(transport, "sk-1");
        assert!(client.is_configured());

        client.configure("   ");
        assert!(!client.is_configured());
    }

    #[tokio::test]
    async fn clones_share_the_credential() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = BackendClient::new(transport);
        let clone = client.clone();

        client.configure("sk-late");
        assert!(clone.is_configured());
    }

    #[tokio::test]
    async fn success_carries_raw_content_and_usage() {
        let transport = Arc::new(ScriptedTransport::new().reply("a", 0, "  hi \n"));
        let client = BackendClient::with_credential(transport.clone(), "sk");

        let outcome = client.send("a", &envelope(), RequestParams::default()).await;

        let reply = outcome.result.unwrap();
        assert_eq!(reply.content, "  hi \n");
        assert_eq!(reply.usage.unwrap().total_tokens, 15);

        let sent = &transport.requests()[0];
        assert_eq!(sent.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(sent.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(sent.messages, envelope());
    }

    #[tokio::test]
    async fn empty_response_is_a_failure() {
        let transport = Arc::new(ScriptedTransport::new().empty("a"));
        let client = BackendClient::with_credential(transport, "sk");

        let outcome = client.send("a", &envelope(), RequestParams::default()).await;
        assert_eq!(outcome.error(), Some("No response received from model"));
    }

    #[tokio::test]
    async fn invalid_arguments_fail_before_the_network() {
        let transport = Arc::new(ScriptedTransport::new().reply("a", 0, "hi"));
        let client = BackendClient::with_credential(transport.clone(), "sk");

        let hot = RequestParams {
            temperature: 2.5,
            ..RequestParams::default()
        };
        assert!(!client.send("a", &envelope(), hot).await.is_success());
        assert!(!client.send("", &envelope(), RequestParams::default()).await.is_success());
        assert!(!client.send("a", &[], RequestParams::default()).await.is_success());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_resolves_to_failure() {
        let transport = Arc::new(ScriptedTransport::new().reply("slow", 5_000, "late"));
        let client = BackendClient::with_credential(transport, "sk");
        let params = RequestParams {
            timeout: Some(Duration::from_secs(1)),
            ..RequestParams::default()
        };

        let outcome = client.send("slow", &envelope(), params).await;
        assert_eq!(outcome.error(), Some("request timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn fan_out_runs_concurrently() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply("a", 100, "one")
                .reply("b", 300, "two")
                .fail("c", 200, "boom"),
        );
        let client = BackendClient::with_credential(transport, "sk");

        let start = Instant::now();
        let outcomes = client
            .send_to_many(&targets(&["a", "b", "c"]), &envelope(), RequestParams::default())
            .await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(600), "took {:?}", elapsed);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes["a"].content(), "one");
        assert_eq!(outcomes["b"].content(), "two");
        assert_eq!(outcomes["c"].error(), Some("boom"));
    }

    #[tokio::test]
    async fn one_entry_per_distinct_target() {
        let transport = Arc::new(ScriptedTransport::new().reply("a", 0, "x"));
        let client = BackendClient::with_credential(transport.clone(), "sk");

        let outcomes = client
            .send_to_many(&targets(&["a", "a"]), &envelope(), RequestParams::default())
            .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn panicking_call_does_not_taint_siblings() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .panic("broken")
                .reply("fine", 0, "still here"),
        );
        let client = BackendClient::with_credential(transport, "sk");

        let mut settled = Vec::new();
        let outcomes = client
            .send_to_many_with(
                &targets(&["broken", "fine"]),
                &envelope(),
                RequestParams::default(),
                |o| settled.push(o.target.clone()),
            )
            .await;

        assert_eq!(outcomes["fine"].content(), "still here");
        assert!(outcomes["broken"].error().unwrap().starts_with("Request failed"));
        settled.sort();
        assert_eq!(settled, vec!["broken".to_string(), "fine".to_string()]);
    }
}
