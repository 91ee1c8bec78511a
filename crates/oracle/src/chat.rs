//! OpenRouter/OpenAI-compatible chat backend.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::{ChatMessage, Decision, Oracle, OracleError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Chat-completions oracle backend.
///
/// Sampling is pinned to temperature 0.0 and the response is requested as
/// a JSON object, so identical context yields identical decisions as far
/// as the backend allows. Every request carries a hard timeout; a slow
/// backend surfaces as `OracleError::Request`, never an unbounded wait.
pub struct ChatOracle {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl ChatOracle {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        model: Option<String>,
    ) -> Self {
        let api_key = api_key.into();
        let is_openrouter = api_key.starts_with("sk-or-")
            || api_base
                .as_ref()
                .map(|b| b.contains("openrouter"))
                .unwrap_or(false);

        let api_base = api_base.unwrap_or_else(|| {
            if is_openrouter {
                "https://openrouter.ai/api/v1".to_string()
            } else {
                "https://api.openai.com/v1".to_string()
            }
        });

        let model = model.unwrap_or_else(|| {
            if is_openrouter {
                "anthropic/claude-sonnet-4".to_string()
            } else {
                "gpt-4".to_string()
            }
        });

        Self {
            client: Client::new(),
            api_key,
            api_base,
            model,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the completion token cap
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(&self, system_prompt: &str, context: &Value) -> Value {
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(context.to_string()),
        ];

        json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            // deterministic sampling; reproducibility over creativity
            "temperature": 0.0,
            "response_format": { "type": "json_object" },
        })
    }

    fn parse_response(&self, json: Value) -> Result<Decision> {
        let choice = json["choices"]
            .get(0)
            .ok_or(OracleError::InvalidResponse)?;
        let content = choice["message"]["content"]
            .as_str()
            .ok_or(OracleError::InvalidResponse)?;

        Decision::from_content(content)
    }
}

#[async_trait::async_trait]
impl Oracle for ChatOracle {
    async fn decide(&self, system_prompt: &str, context: &Value) -> Result<Decision> {
        if !self.is_configured() {
            return Err(OracleError::NoApiKey);
        }

        trace!("consulting oracle at {}", self.api_base);

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(system_prompt, context);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let json: Value = response.json().await?;

        if !status.is_success() {
            let error = json["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            if status.as_u16() == 429 {
                return Err(OracleError::RateLimited);
            }
            return Err(OracleError::Api(error));
        }

        let decision = self.parse_response(json)?;
        debug!(action = %decision.action, "oracle proposed");
        Ok(decision)
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
