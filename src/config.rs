//! Application configuration
//!
//! Loaded once at startup from a TOML file (default `~/.policydesk/config.toml`)
//! with an `OPENAI_API_KEY` environment override, validated before any
//! component is constructed.

use crate::errors::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub returns: ReturnsConfig,
}

/// Provider endpoints and model identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key; the OPENAI_API_KEY environment variable overrides this
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Chat model used for analysis and response generation
    pub llm_model: String,
    /// Embedding model
    pub embedding_model: String,
    /// Embedding vector dimension
    pub embedding_dimension: usize,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimension: 1536,
            request_timeout_secs: 30,
        }
    }
}

/// Chunking and retrieval parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// Number of results to retrieve per query
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
        }
    }
}

/// Persisted vector collection location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the persisted collection
    pub path: PathBuf,
    /// Collection name
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".policydesk")
            .join("store");
        Self {
            path,
            collection: "ecommerce_policies".to_string(),
        }
    }
}

/// Category-to-window-days table for return eligibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsConfig {
    /// Days allowed per product category (lowercase keys)
    pub windows: HashMap<String, u32>,
    /// Window applied to unrecognized categories
    pub default_days: u32,
}

impl Default for ReturnsConfig {
    fn default() -> Self {
        let mut windows = HashMap::new();
        windows.insert("general".to_string(), 30);
        windows.insert("electronics".to_string(), 15);
        windows.insert("clothing".to_string(), 60);
        windows.insert("food".to_string(), 7);
        windows.insert("perishables".to_string(), 7);
        Self {
            windows,
            default_days: 30,
        }
    }
}

impl Config {
    /// Load configuration from a file, creating the default if it doesn't exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)?;
            toml::from_str(&contents).map_err(|e| {
                AgentError::InvalidConfiguration(format!(
                    "failed to parse {}: {}",
                    config_path.display(),
                    e
                ))
            })?
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            config
        };

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                config.api.api_key = Some(key);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            AgentError::InvalidConfiguration(format!("failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            AgentError::InvalidConfiguration("could not determine home directory".to_string())
        })?;
        Ok(home.join(".policydesk").join("config.toml"))
    }

    /// Validate the configuration; errors here are fatal at startup
    pub fn validate(&self) -> Result<()> {
        if self.rag.chunk_size == 0 {
            return Err(AgentError::InvalidConfiguration(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(AgentError::InvalidConfiguration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if self.rag.top_k == 0 {
            return Err(AgentError::InvalidConfiguration(
                "top_k must be at least 1".to_string(),
            ));
        }
        if self.api.embedding_dimension == 0 {
            return Err(AgentError::InvalidConfiguration(
                "embedding_dimension must be positive".to_string(),
            ));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(AgentError::InvalidConfiguration(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// API key, or a configuration error telling the user how to set it
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(AgentError::InvalidConfiguration(
                "no API key configured; set OPENAI_API_KEY or api.api_key in config.toml"
                    .to_string(),
            )),
        }
    }
}
