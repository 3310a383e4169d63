//! Send one question to several chat models at once and compare the answers.
//!
//! [`dispatcher::Dispatcher`] fans a message out through a
//! [`client::BackendClient`] and records every model's result in a
//! [`store::ConversationStore`]. Everything else in the crate is the terminal
//! front end built on top of those three.

pub mod app;
pub mod catalog;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod display;
pub mod input;
pub mod providers;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;

pub use client::{BackendClient, Outcome, Reply, RequestParams};
pub use crate::core::error::MchatError;
pub use dispatcher::{DispatchReport, Dispatcher};
pub use store::{ConversationState, ConversationStore, StoreEvent, Turn, TurnOrigin};
