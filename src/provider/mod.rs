use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::errors::SiteError;
use crate::wire::Instruction;

pub mod ollama;
pub mod openai;

/// Model id and sampling knobs sent with every completion.
#[derive(Debug, Clone)]
pub struct Sampling {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&Config> for Sampling {
    fn from(cfg: &Config) -> Self {
        Self { model: cfg.model.clone(), temperature: cfg.temperature, max_tokens: cfg.max_tokens }
    }
}

/// A chat-completion backend. One call, one attempt: failures are returned
/// as they come back from the transport.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    /// Text of the first choice. Whitespace-only content is `EmptyResponse`.
    async fn complete(&self, ins: &Instruction) -> Result<String, SiteError>;
}

pub type DynProvider = Arc<dyn Provider>;

pub fn make_provider(cfg: &Config) -> Result<DynProvider, SiteError> {
    let client = http_client(cfg.upstream_timeout_secs)?;
    let sampling = Sampling::from(cfg);
    Ok(match cfg.provider {
        ProviderKind::OpenAI => Arc::new(openai::OpenAIProvider::new(
            client,
            cfg.api_base.clone(),
            cfg.api_key.clone(),
            sampling,
        )),
        ProviderKind::Ollama => {
            Arc::new(ollama::OllamaProvider::new(client, cfg.ollama_url.clone(), sampling))
        }
    })
}

fn http_client(timeout_secs: Option<u64>) -> Result<Client, SiteError> {
    let mut builder = Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(|e| SiteError::Config(format!("http client: {e}")))
}

/// Returns the text unless it is missing or blank.
pub(crate) fn non_empty(content: Option<String>) -> Result<String, SiteError> {
    match content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(SiteError::EmptyResponse),
    }
}
