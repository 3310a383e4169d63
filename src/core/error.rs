use std::io;
use thiserror::Error;

/// Unified error type for mchat
#[derive(Error, Debug)]
pub enum MchatError {
    /// No credential has been configured for the backend client
    #[error("API key required: configure your OpenRouter API key first")]
    CredentialRequired,

    /// One or more targets still have a request in flight
    #[error("Busy: request still in flight for {}", .0.join(", "))]
    Busy(Vec<String>),

    /// API-related errors (upstream reported failure, empty response)
    #[error("API error: {0}")]
    Api(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// User input errors
    #[error("Input error: {0}")]
    Input(String),

    /// The fan-out itself could not be run to completion
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(String),
}

impl MchatError {
    /// The bare message without the category prefix, as shown next to a model.
    pub fn reason(&self) -> String {
        match self {
            MchatError::Api(msg)
            | MchatError::Config(msg)
            | MchatError::Input(msg)
            | MchatError::Dispatch(msg)
            | MchatError::Serialization(msg)
            | MchatError::Network(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for MchatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MchatError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            MchatError::Network(format!("Connection failed: {}", err))
        } else if err.is_status() {
            MchatError::Api(format!("API returned error status: {}", err))
        } else if err.is_decode() {
            MchatError::Serialization(format!("Malformed response body: {}", err))
        } else {
            MchatError::Network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for MchatError {
    fn from(err: serde_json::Error) -> Self {
        MchatError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for MchatError {
    fn from(err: serde_yml::Error) -> Self {
        MchatError::Serialization(format!("YAML error: {}", err))
    }
}
