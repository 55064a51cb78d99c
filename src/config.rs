use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Every section is optional; a deployment with no `config.toml` at all runs
/// on defaults plus environment overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub openai: OpenAIConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Retrieval configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Knowledge artifact produced by the offline extraction pipeline
    pub knowledge_path: PathBuf,
    /// Optional embedding artifact; absence switches retrieval to lexical mode
    pub embeddings_path: PathBuf,
    /// Number of chunks handed to the answer generator (top-K)
    pub max_chunks: usize,
    /// Name used in the assistant persona line of the system prompt
    pub owner_name: Option<String>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            knowledge_path: PathBuf::from("data/rag/knowledge.json"),
            embeddings_path: PathBuf::from("data/rag/embeddings.json"),
            max_chunks: DEFAULT_MAX_CHUNKS,
            owner_name: None,
        }
    }
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// LRU capacity for query embeddings; 0 disables the cache
    pub query_cache_capacity: usize,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: 0.2,
            max_tokens: 350,
            timeout_secs: 30,
            query_cache_capacity: 0,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            // Empty means any origin; list origins explicitly for production
            allowed_origins: vec![],
        }
    }
}

pub const DEFAULT_MAX_CHUNKS: usize = 5;

impl Config {
    /// Load configuration
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for the config file in this order:
    /// 1. Path specified in RAG_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (optional)
    ///
    /// Environment overrides (OPENAI_MODEL, OPENAI_EMBEDDING_MODEL, OPENAI_BASE_URL,
    /// RAG_MAX_CHUNKS) are applied on top of the file.
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let mut config = match std::env::var("RAG_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let default_path = PathBuf::from("config.toml");
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    log::debug!("No config.toml found, using defaults");
                    Config::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML config file without applying environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = non_empty("OPENAI_MODEL") {
            self.openai.model = model;
        }
        if let Some(model) = non_empty("OPENAI_EMBEDDING_MODEL") {
            self.openai.embedding_model = model;
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.openai.base_url = url;
        }
        if let Some(raw) = non_empty("RAG_MAX_CHUNKS") {
            match raw.trim().parse::<usize>() {
                Ok(k) if k > 0 => self.rag.max_chunks = k,
                _ => log::warn!(
                    "Ignoring RAG_MAX_CHUNKS={:?}: expected a positive integer, keeping {}",
                    raw,
                    self.rag.max_chunks
                ),
            }
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.rag.max_chunks == 0 {
            anyhow::bail!("rag.max_chunks must be greater than 0");
        }

        if self.openai.timeout_secs == 0 {
            anyhow::bail!("openai.timeout_secs must be greater than 0");
        }

        if !(0.0..=2.0).contains(&self.openai.temperature) {
            anyhow::bail!("openai.temperature must be between 0.0 and 2.0");
        }

        if self.openai.base_url.trim().is_empty() {
            anyhow::bail!("openai.base_url must not be empty");
        }

        Ok(())
    }

    /// API credential from the environment; `None` means the backend runs unconfigured
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.openai.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn knowledge_path(&self) -> &Path {
        &self.rag.knowledge_path
    }

    pub fn embeddings_path(&self) -> &Path {
        &self.rag.embeddings_path
    }
}
