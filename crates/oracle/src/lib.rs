//! Oracle boundary: the external decision-maker behind a typed contract.
//!
//! The rest of the system never sees raw model output. A backend either
//! yields a well-formed [`Decision`] or a typed [`OracleError`]; the
//! validation layer turns either into a legal action, so oracle
//! unavailability can never abort a run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod chat;

pub use chat::ChatOracle;

/// Oracle boundary errors
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle unreachable: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("oracle rejected request: {0}")]
    Api(String),

    #[error("no api key configured")]
    NoApiKey,

    #[error("response missing expected fields")]
    InvalidResponse,

    #[error("undecodable decision: {0}")]
    Malformed(String),

    #[error("rate limited")]
    RateLimited,
}

pub type Result<T> = std::result::Result<T, OracleError>;

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// The oracle's parsed proposal for one step.
///
/// `action` is the raw action-name token as proposed; it stays a string
/// here because it is untrusted input. The validation layer resolves it
/// into a typed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Free-text reasoning; the wire format uses either `thought` or
    /// `reasoning`.
    #[serde(alias = "thought", default)]
    pub reasoning: String,
    #[serde(default)]
    pub action: String,
    #[serde(default = "empty_object")]
    pub arguments: Value,
}

impl Decision {
    /// The defined no-op decision substituted when the oracle is
    /// unavailable or its output cannot be decoded.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            reasoning: reason.into(),
            action: "none".to_string(),
            arguments: empty_object(),
        }
    }

    /// Parse a decision out of an assistant message body.
    pub fn from_content(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| OracleError::Malformed(e.to_string()))
    }
}

/// A chat message on the oracle wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// External decision-making component consulted once per step.
///
/// Implementations must sample deterministically (temperature 0 or the
/// backend's equivalent) and must bound how long a call can block.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Ask for a decision given static instructions and the current
    /// context snapshot.
    async fn decide(&self, system_prompt: &str, context: &Value) -> Result<Decision>;

    /// Whether the backend has what it needs to be called at all.
    fn is_configured(&self) -> bool;
}
