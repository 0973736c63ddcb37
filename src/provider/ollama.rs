use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{non_empty, Provider, Sampling};
use crate::errors::SiteError;
use crate::wire::Instruction;

/// Local Ollama daemon (`POST {url}/api/chat`, non-streaming).
pub struct OllamaProvider {
    client: Client,
    url: String,
    sampling: Sampling,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Msg<'a>; 2],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<MsgOut>,
}

#[derive(Deserialize)]
struct MsgOut {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl OllamaProvider {
    pub fn new(client: Client, url: String, sampling: Sampling) -> Self {
        Self { client, url, sampling }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.sampling.model
    }

    async fn complete(&self, ins: &Instruction) -> Result<String, SiteError> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.sampling.model,
            messages: [
                Msg { role: "system", content: &ins.system },
                Msg { role: "user", content: &ins.user },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.sampling.temperature,
                num_predict: self.sampling.max_tokens,
            },
        };

        debug!(%url, model = %self.sampling.model, "ollama: POST");

        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text).map(|b| b.error).unwrap_or(text);
            warn!(status = status.as_u16(), "ollama: request failed");
            return Err(SiteError::Upstream { status: Some(status.as_u16()), kind: None, message });
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| SiteError::Upstream {
            status: Some(status.as_u16()),
            kind: Some("invalid_response".into()),
            message: format!("failed to parse Ollama response: {e}"),
        })?;
        non_empty(parsed.message.and_then(|m| m.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::spawn_upstream;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn provider(base: String) -> OllamaProvider {
        let sampling = Sampling { model: "llama3".into(), temperature: 0.5, max_tokens: 64 };
        OllamaProvider::new(Client::new(), base, sampling)
    }

    fn ins() -> Instruction {
        Instruction { system: "sys".into(), user: "usr".into() }
    }

    #[tokio::test]
    async fn returns_message_content() {
        async fn chat(Json(body): Json<Value>) -> Json<Value> {
            let ok = body["stream"] == json!(false)
                && body["model"] == "llama3"
                && body["options"]["num_predict"] == 64
                && body["messages"][1]["content"] == "usr";
            let content = if ok { "{\"pages\":{}}" } else { "bad request" };
            Json(json!({ "message": { "role": "assistant", "content": content } }))
        }
        let base = spawn_upstream(Router::new().route("/api/chat", post(chat))).await;
        assert_eq!(provider(base).complete(&ins()).await.unwrap(), "{\"pages\":{}}");
    }

    #[tokio::test]
    async fn error_body_is_surfaced() {
        async fn missing() -> (StatusCode, Json<Value>) {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "model \"llama3\" not found" })))
        }
        let base = spawn_upstream(Router::new().route("/api/chat", post(missing))).await;
        match provider(base).complete(&ins()).await {
            Err(SiteError::Upstream { status: Some(404), message, .. }) => {
                assert!(message.contains("not found"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_message_is_empty_response() {
        async fn blank() -> Json<Value> {
            Json(json!({ "message": { "role": "assistant", "content": "" } }))
        }
        let base = spawn_upstream(Router::new().route("/api/chat", post(blank))).await;
        assert!(matches!(provider(base).complete(&ins()).await, Err(SiteError::EmptyResponse)));
    }
}
