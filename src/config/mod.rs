use anyhow::Context;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::{Args, ProviderKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Environment::Production),
            "development" | "dev" => Some(Environment::Development),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    pub model: String,
    pub api_base: String,
    /// Read from OPENAI_API_KEY; never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub ollama_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    /// None leaves the HTTP client on its own default.
    pub upstream_timeout_secs: Option<u64>,
    pub environment: Environment,
    pub save_responses: bool,
    pub artifacts_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAI,
            model: "gpt-4o-mini".into(),
            api_base: "https://api.openai.com/v1".into(),
            api_key: None,
            ollama_url: "http://localhost:11434".into(),
            temperature: 0.7,
            max_tokens: 4000,
            host: "0.0.0.0".into(),
            port: 3001,
            request_timeout_secs: 120,
            upstream_timeout_secs: None,
            environment: Environment::Development,
            save_responses: false,
            artifacts_dir: ".sitegen/artifacts".into(),
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then environment, then flags.
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let mut cfg = match &args.config {
            Some(path) => Self::from_file(Path::new(path))?,
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.apply_args(args);
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(port) = var("PORT").and_then(|p| p.trim().parse().ok()) {
            self.port = port;
        }
        if let Some(env) = var("APP_ENV").as_deref().and_then(Environment::parse) {
            self.environment = env;
        }
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(p) = args.provider {
            self.provider = p;
        }
        if let Some(m) = &args.model {
            self.model = m.clone();
        }
        if let Some(h) = &args.host {
            self.host = h.clone();
        }
        if let Some(p) = args.port {
            self.port = p;
        }
        if let Some(t) = args.temperature {
            self.temperature = t;
        }
        if let Some(n) = args.max_tokens {
            self.max_tokens = n;
        }
        if let Some(s) = args.timeout_secs {
            self.request_timeout_secs = s;
        }
        if args.save_responses {
            self.save_responses = true;
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn file_values_merge_over_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "model = \"gpt-4.1-mini\"\nport = 8080\nenvironment = \"production\"").unwrap();
        let cfg = Config::from_file(f.path()).unwrap();
        assert_eq!(cfg.model, "gpt-4.1-mini");
        assert_eq!(cfg.port, 8080);
        assert!(cfg.is_production());
        assert_eq!(cfg.request_timeout_secs, 120);
        assert_eq!(cfg.provider, ProviderKind::OpenAI);
    }

    #[test]
    fn bad_file_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "port = \"not a number\"").unwrap();
        assert!(Config::from_file(f.path()).is_err());
    }

    #[test]
    fn env_then_flags_override() {
        let env: HashMap<&str, &str> =
            [("OPENAI_API_KEY", "sk-test"), ("PORT", "4000"), ("APP_ENV", "prod")]
                .into_iter()
                .collect();
        let mut cfg = Config::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.port, 4000);
        assert!(cfg.is_production());

        let args = Args {
            port: Some(5000),
            model: Some("llama3".into()),
            provider: Some(ProviderKind::Ollama),
            ..Default::default()
        };
        cfg.apply_args(&args);
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.model, "llama3");
        assert_eq!(cfg.provider, ProviderKind::Ollama);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn api_key_is_not_serialized() {
        let cfg = Config { api_key: Some("secret".into()), ..Config::default() };
        let text = toml::to_string(&cfg).unwrap();
        assert!(!text.contains("secret"));
    }
}
