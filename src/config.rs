//! Application configuration.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. Built-in defaults (every field has one, so no file is required)
//! 2. `config.yaml` (or the path given with `--config` / `SOURCESHIELD_CONFIG`)
//! 3. Environment variables, including a `.env` file in the working directory
//!
//! Secrets (`OPENAI_API_KEY`, `HF_API_TOKEN`) are only ever read from the
//! environment and never from the YAML file.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Value shipped in `.env.example`; treated the same as a missing key.
pub const PLACEHOLDER_OPENAI_KEY: &str = "your_openai_api_key_here";

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub models: ModelConfig,
    pub openai: OpenAiConfig,
    pub scraping: ScrapingConfig,
    pub server: ServerConfig,
    pub prompts: PromptConfig,

    #[serde(skip)]
    pub openai_api_key: Option<String>,
    #[serde(skip)]
    pub hf_api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding the analysis documents. `:memory:` is accepted.
    pub url: String,
    pub collection_name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sourceshield.db".to_string(),
            collection_name: "analyses".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub sentiment_model: String,
    pub similarity_model: String,
    /// Base URL of the hosted inference API; the model id is appended.
    pub inference_url: String,
    /// When false the rule-based sentiment fallback is always used.
    pub remote_sentiment: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            sentiment_model: "cardiffnlp/twitter-roberta-base-sentiment-latest".to_string(),
            similarity_model: "text-embedding-3-small".to_string(),
            inference_url: "https://api-inference.huggingface.co/models".to_string(),
            remote_sentiment: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_base: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_retries: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 1000,
            temperature: 0.3,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    pub user_agent: String,
}

impl ScrapingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; SourceShield/0.1; +https://example.invalid/bot)"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8501)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Directory searched for `<prompt_type>.txt` overrides.
    pub dir: PathBuf,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("prompts"),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from `config.yaml` when it exists,
    /// then apply environment overrides.
    ///
    /// An explicitly given path that does not exist is an error; a missing
    /// default file is not.
    #[instrument(level = "info", skip_all)]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No config.yaml found; using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&raw)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply environment-style overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.database.url = url;
        }
        if let Some(bind) = lookup("SOURCESHIELD_BIND") {
            match bind.parse() {
                Ok(addr) => self.server.bind = addr,
                Err(e) => warn!(%bind, error = %e, "Ignoring invalid SOURCESHIELD_BIND"),
            }
        }
        self.openai_api_key = lookup("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != PLACEHOLDER_OPENAI_KEY);
        if self.openai_api_key.is_none() {
            warn!("OpenAI API key not provided or is placeholder; AI analysis disabled");
        }
        self.hf_api_token = lookup("HF_API_TOKEN").filter(|t| !t.trim().is_empty());
    }
}
