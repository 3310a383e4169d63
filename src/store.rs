//! Per-model conversation state.
//!
//! Every mutation swaps in a fresh `Arc` for the one model it touches. The
//! snapshots of all other models keep their identity, so observers comparing
//! with `Arc::ptr_eq` only react to the model that actually changed.
//!
//! Each batch of user turns is stamped with a store-wide round number. Replies
//! and errors carry the round they answer and are dropped once the
//! conversation has moved to another round, or was cleared and started over.

use crate::client::distinct;
use crate::core::error::MchatError;
use crate::providers::Usage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnOrigin {
    User,
    Backend,
}

/// One entry of a conversation. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub origin: TurnOrigin,
}

impl Turn {
    fn new(content: impl Into<String>, origin: TurnOrigin) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            created_at: Utc::now(),
            origin,
        }
    }

    pub fn is_user(&self) -> bool {
        self.origin == TurnOrigin::User
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationState {
    pub target: String,
    pub messages: Vec<Turn>,
    pub loading: bool,
    pub error: Option<String>,
    pub usage: Option<Usage>,
    /// Round of the latest user turn; 0 before the first one.
    pub round: u64,
}

impl ConversationState {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            messages: Vec::new(),
            loading: false,
            error: None,
            usage: None,
            round: 0,
        }
    }

    /// Most recent backend-authored turn.
    pub fn last_reply(&self) -> Option<&Turn> {
        self.messages.iter().rev().find(|t| !t.is_user())
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.error.is_none() && self.usage.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The snapshot for this model was replaced.
    Changed(String),
    /// Every conversation was dropped.
    Cleared,
}

pub struct ConversationStore {
    states: RwLock<HashMap<String, Arc<ConversationState>>>,
    events: broadcast::Sender<StoreEvent>,
    rounds: AtomicU64,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            states: RwLock::new(HashMap::new()),
            events,
            rounds: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<ConversationState>>> {
        self.states.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<ConversationState>>> {
        self.states.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn get(&self, target: &str) -> Option<Arc<ConversationState>> {
        self.read().get(target).cloned()
    }

    pub fn get_all(&self) -> HashMap<String, Arc<ConversationState>> {
        self.read().clone()
    }

    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.read().keys().cloned().collect();
        targets.sort();
        targets
    }

    pub fn is_loading(&self, target: &str) -> bool {
        self.read().get(target).is_some_and(|s| s.loading)
    }

    /// Create the empty state for `target` unless one exists. Returns whether
    /// a new state was created.
    pub fn initialize(&self, target: &str) -> bool {
        let created = {
            let mut states = self.write();
            if states.contains_key(target) {
                false
            } else {
                states.insert(target.to_string(), Arc::new(ConversationState::new(target)));
                true
            }
        };
        if created {
            debug!(model = %target, "conversation initialized");
            self.notify(StoreEvent::Changed(target.to_string()));
        }
        created
    }

    /// Replace the snapshot of an existing target. Returns false when the
    /// target is unknown or, with `round` given, no longer on that round.
    fn update<F>(&self, target: &str, round: Option<u64>, apply: F) -> bool
    where
        F: FnOnce(&mut ConversationState),
    {
        {
            let mut states = self.write();
            let Some(current) = states.get_mut(target) else {
                return false;
            };
            if round.is_some_and(|r| r != current.round) {
                return false;
            }
            let mut next = ConversationState::clone(current);
            apply(&mut next);
            *current = Arc::new(next);
        }
        self.notify(StoreEvent::Changed(target.to_string()));
        true
    }

    /// Start a round for every target at once: append the user turn, mark
    /// loading and clear the previous error. Nothing changes if any target is
    /// still loading. Returns the round that replies must quote.
    pub fn begin_turns(&self, targets: &[String], content: &str) -> Result<u64, MchatError> {
        let targets = distinct(targets);
        let round = {
            let mut states = self.write();

            let busy: Vec<String> = targets
                .iter()
                .filter(|t| states.get(t.as_str()).is_some_and(|s| s.loading))
                .cloned()
                .collect();
            if !busy.is_empty() {
                return Err(MchatError::Busy(busy));
            }

            let round = self.rounds.fetch_add(1, Ordering::Relaxed) + 1;
            for target in &targets {
                let current = states
                    .entry(target.clone())
                    .or_insert_with(|| Arc::new(ConversationState::new(target.as_str())));
                let mut next = ConversationState::clone(current);
                next.messages.push(Turn::new(content, TurnOrigin::User));
                next.loading = true;
                next.error = None;
                next.round = round;
                *current = Arc::new(next);
            }
            round
        };

        for target in &targets {
            trace!(model = %target, round, "user turn appended");
            self.notify(StoreEvent::Changed(target.clone()));
        }
        Ok(round)
    }

    /// Single-target form of [`begin_turns`](Self::begin_turns).
    pub fn append_user_turn(&self, target: &str, content: &str) -> Result<u64, MchatError> {
        self.begin_turns(&[target.to_string()], content)
    }

    /// Record the reply to `round`. Returns false when the reply was dropped.
    pub fn append_assistant_turn(
        &self,
        target: &str,
        round: u64,
        content: &str,
        usage: Option<Usage>,
    ) -> bool {
        let applied = self.update(target, Some(round), |state| {
            state.messages.push(Turn::new(content, TurnOrigin::Backend));
            state.loading = false;
            state.usage = usage;
        });
        if !applied {
            debug!(model = %target, round, "dropping stale reply");
        }
        applied
    }

    pub fn set_error(&self, target: &str, round: u64, error: &str) -> bool {
        let applied = self.update(target, Some(round), |state| {
            state.loading = false;
            state.error = Some(error.to_string());
        });
        if !applied {
            debug!(model = %target, round, "dropping stale error");
        }
        applied
    }

    /// Empty one conversation. The loading flag and round survive so an
    /// in-flight reply still lands.
    pub fn clear(&self, target: &str) {
        if self.get(target).is_none_or(|s| s.is_empty()) {
            return;
        }
        self.update(target, None, |state| {
            state.messages.clear();
            state.error = None;
            state.usage = None;
        });
    }

    pub fn clear_all(&self) {
        self.write().clear();
        debug!("all conversations cleared");
        self.notify(StoreEvent::Cleared);
    }
}
