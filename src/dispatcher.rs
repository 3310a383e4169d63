use crate::client::{BackendClient, Outcome, RequestParams, distinct};
use crate::core::error::MchatError;
use crate::providers::Message;
use crate::store::ConversationStore;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful AI assistant. Provide clear, accurate, and helpful responses.";
const DISPATCH_FAILED: &str = "Failed to get response from model";

/// Summary of one round, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub responded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl DispatchReport {
    pub fn responded_count(&self) -> usize {
        self.responded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total(&self) -> usize {
        self.responded.len() + self.failed.len()
    }
}

/// Fans a user message out to several models and records the results.
#[derive(Clone)]
pub struct Dispatcher {
    client: BackendClient,
    store: Arc<ConversationStore>,
}

impl Dispatcher {
    pub fn new(client: BackendClient, store: Arc<ConversationStore>) -> Self {
        Self { client, store }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// The request sent upstream: the system instruction and the new message
    /// only. Earlier turns are not replayed.
    pub fn envelope(user_text: &str) -> Vec<Message> {
        vec![Message::system(SYSTEM_INSTRUCTION), Message::user(user_text)]
    }

    pub async fn send_to_targets(
        &self,
        targets: &[String],
        user_text: &str,
        params: RequestParams,
    ) -> Result<DispatchReport, MchatError> {
        if !self.client.is_configured() {
            warn!("dispatch rejected: no API key configured");
            return Err(MchatError::CredentialRequired);
        }

        let targets = distinct(targets);
        if targets.is_empty() {
            return Err(MchatError::Input("no models selected".to_string()));
        }
        if user_text.trim().is_empty() {
            return Err(MchatError::Input("message must not be empty".to_string()));
        }
        params.validate()?;

        let round = self.store.begin_turns(&targets, user_text)?;
        info!(models = targets.len(), round, "dispatching message");

        let client = self.client.clone();
        let store = Arc::clone(&self.store);
        let envelope = Self::envelope(user_text);
        let requested = targets.clone();
        let fan_out = async move {
            client
                .send_to_many_with(&requested, &envelope, params, |outcome| {
                    apply_outcome(&store, round, outcome)
                })
                .await
        };

        self.settle_round(targets, round, fan_out).await
    }

    /// Drive a started round to completion. If the fan-out itself dies, every
    /// target still waiting on `round` is marked failed.
    async fn settle_round<F>(
        &self,
        targets: Vec<String>,
        round: u64,
        fan_out: F,
    ) -> Result<DispatchReport, MchatError>
    where
        F: Future<Output = HashMap<String, Outcome>> + Send + 'static,
    {
        let mut outcomes = match tokio::spawn(fan_out).await {
            Ok(outcomes) => outcomes,
            Err(err) => {
                error!(error = %err, round, "fan-out aborted");
                for target in &targets {
                    self.fail_if_waiting(target, round);
                }
                return Err(MchatError::Dispatch(err.to_string()));
            }
        };

        let mut report = DispatchReport::default();
        for target in targets {
            match outcomes.remove(&target).map(|o| o.result) {
                Some(Ok(_)) => report.responded.push(target),
                Some(Err(reason)) => report.failed.push((target, reason)),
                None => {
                    self.fail_if_waiting(&target, round);
                    report.failed.push((target, DISPATCH_FAILED.to_string()));
                }
            }
        }

        info!(
            responded = report.responded_count(),
            failed = report.failed_count(),
            "dispatch finished"
        );
        Ok(report)
    }

    fn fail_if_waiting(&self, target: &str, round: u64) {
        if self.store.is_loading(target) {
            self.store.set_error(target, round, DISPATCH_FAILED);
        }
    }
}

fn apply_outcome(store: &ConversationStore, round: u64, outcome: &Outcome) {
    match &outcome.result {
        Ok(reply) => {
            store.append_assistant_turn(&outcome.target, round, &reply.content, reply.usage);
        }
        Err(reason) => {
            store.set_error(&outcome.target, round, reason);
        }
    }
}
