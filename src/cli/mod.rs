use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
    #[value(name = "ollama")]
    Ollama,
}

#[derive(Parser, Debug, Default)]
#[command(
    name = "sitegen",
    version,
    about = "Generate editable websites from a natural-language description"
)]
pub struct Args {
    /// TOML config file; flags below override it.
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Per-request timeout of the HTTP layer.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long, default_value_t = false)]
    pub save_responses: bool,

    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_alias() {
        let args = Args::parse_from(["sitegen", "--provider", "open-ai", "--port", "8080"]);
        assert_eq!(args.provider, Some(ProviderKind::OpenAI));
        assert_eq!(args.port, Some(8080));
        assert!(!args.debug);
    }
}
