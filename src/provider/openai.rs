use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{non_empty, Provider, Sampling};
use crate::errors::SiteError;
use crate::wire::Instruction;

/// OpenAI-compatible chat completions (`POST {api_base}/chat/completions`).
pub struct OpenAIProvider {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    sampling: Sampling,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl OpenAIProvider {
    pub fn new(
        client: Client,
        api_base: String,
        api_key: Option<String>,
        sampling: Sampling,
    ) -> Self {
        Self { client, api_base, api_key, sampling }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.sampling.model
    }

    async fn complete(&self, ins: &Instruction) -> Result<String, SiteError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SiteError::Config("OPENAI_API_KEY env var is not set".into()))?;

        let body = json!({
            "model": self.sampling.model,
            "messages": [
                { "role": "system", "content": ins.system },
                { "role": "user", "content": ins.user }
            ],
            "temperature": self.sampling.temperature,
            "max_tokens": self.sampling.max_tokens,
        });

        let url = self.url();
        debug!(%url, model = %self.sampling.model, "openai: POST");

        let resp = self.client.post(&url).bearer_auth(api_key).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let (message, kind) = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(env) => (env.error.message, env.error.kind),
                Err(_) => (text, None),
            };
            warn!(status = status.as_u16(), kind = ?kind, "openai: request failed");
            return Err(SiteError::Upstream { status: Some(status.as_u16()), kind, message });
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| SiteError::Upstream {
            status: Some(status.as_u16()),
            kind: Some("invalid_response".into()),
            message: format!("failed to parse OpenAI response: {e}"),
        })?;
        if let Some(usage) = &parsed.usage {
            debug!(%usage, "openai: usage");
        }

        let content =
            parsed.choices.into_iter().next().and_then(|c| c.message).and_then(|m| m.content);
        non_empty(content)
    }
}
