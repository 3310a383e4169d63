//! Scripted transport used by the unit tests.

use crate::core::error::MchatError;
use crate::providers::{ChatTransport, Completion, CompletionRequest, Usage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Clone)]
enum Script {
    Reply(String),
    Fail(String),
    Empty,
    Panic,
}

#[derive(Clone)]
struct Step {
    delay: Duration,
    script: Script,
    gate: Option<std::sync::Arc<Notify>>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    steps: HashMap<String, Step>,
    calls: AtomicUsize,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn step(mut self, model: &str, delay_ms: u64, script: Script) -> Self {
        self.steps.insert(
            model.to_string(),
            Step {
                delay: Duration::from_millis(delay_ms),
                script,
                gate: None,
            },
        );
        self
    }

    pub fn reply(self, model: &str, delay_ms: u64, content: &str) -> Self {
        self.step(model, delay_ms, Script::Reply(content.to_string()))
    }

    pub fn fail(self, model: &str, delay_ms: u64, reason: &str) -> Self {
        self.step(model, delay_ms, Script::Fail(reason.to_string()))
    }

    pub fn empty(self, model: &str) -> Self {
        self.step(model, 0, Script::Empty)
    }

    pub fn panic(self, model: &str) -> Self {
        self.step(model, 0, Script::Panic)
    }

    /// Hold the reply for `model` until `gate` is notified.
    pub fn gated(mut self, model: &str, content: &str, gate: std::sync::Arc<Notify>) -> Self {
        self.steps.insert(
            model.to_string(),
            Step {
                delay: Duration::ZERO,
                script: Script::Reply(content.to_string()),
                gate: Some(gate),
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn chat_completion(
        &self,
        _credential: &str,
        request: &CompletionRequest,
    ) -> Result<Completion, MchatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());

        let step = self
            .steps
            .get(&request.model)
            .cloned()
            .unwrap_or_else(|| panic!("no script for {}", request.model));

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        if let Some(gate) = &step.gate {
            gate.notified().await;
        }

        match step.script {
            Script::Reply(content) => Ok(Completion {
                content: Some(content),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
            }),
            Script::Fail(reason) => Err(MchatError::Network(reason)),
            Script::Empty => Ok(Completion::default()),
            Script::Panic => panic!("transport blew up"),
        }
    }
}
