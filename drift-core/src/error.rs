//! Error types for the store clients, the retraining trigger and startup
//! configuration.
//!
//! None of these are fatal inside the monitor loop: query failures degrade to
//! an empty window, trigger failures leave the cooldown untouched.

use thiserror::Error;

/// Longest response body excerpt carried inside an error.
const BODY_EXCERPT_CHARS: usize = 200;

/// The event store or metrics store could not answer.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid store endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("store request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("store answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed store response: {0}")]
    Malformed(String),
}

/// The retraining endpoint refused or could not be reached.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// No usable trigger token is configured.
    #[error("no retraining trigger token configured")]
    MissingCredential,

    #[error("invalid CI endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("CI answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("CI request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

/// A configuration value could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Trim a response body so it can be logged without flooding the output.
pub(crate) fn body_excerpt(body: &str) -> String {
    let trimmed = body.replace('\n', " ").trim().to_string();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        return trimmed;
    }
    let mut out: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
    out.push_str("...");
    out
}
