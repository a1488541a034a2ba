//! Generation client - the language-model seam
//!
//! The orchestrator hands over a message sequence plus a schema descriptor
//! and gets back the raw structured payload; decoding into typed records
//! happens upstream. Non-determinism is expected and is the point.

use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{ForgeError, Result};

pub const DEFAULT_MODEL: &str = "gpt-4o-2024-08-06";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// One message in the structured prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Trait implemented by generation providers (OpenAI, test stubs).
///
/// The returned payload either conforms to the supplied schema or the call
/// fails; a payload the provider accepted but that does not decode is a
/// schema violation surfaced by the caller.
pub trait ConceptGenerator {
    /// Send the message sequence, constrained to the given response shape,
    /// and return the raw structured payload.
    fn generate(&self, messages: &[ChatMessage], schema: &Value) -> Result<Value>;
}

/// OpenAI chat-completions provider with JSON-schema structured output.
pub struct OpenAiGenerator {
    api_key: String,
    api_url: String,
    model: String,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

impl ConceptGenerator for OpenAiGenerator {
    fn generate(&self, messages: &[ChatMessage], schema: &Value) -> Result<Value> {
        let payload = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "concept_list",
                    "strict": true,
                    "schema": schema
                }
            }
        });

        let agent = build_agent();
        let mut response = agent
            .post(&self.api_url)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send_json(&payload)
            .map_err(|e| ForgeError::Transport(format!("generation request failed: {}", e)))?;

        let body: Value = response
            .body_mut()
            .read_json()
            .map_err(|e| ForgeError::Transport(format!("unreadable generation response: {}", e)))?;

        let content = body
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                ForgeError::SchemaViolation("generation response has no message content".into())
            })?;

        serde_json::from_str(content).map_err(|e| {
            ForgeError::SchemaViolation(format!("message content is not valid JSON: {}", e))
        })
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .build();
    config.into()
}
