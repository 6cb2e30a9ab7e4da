//! Configuration for the evaluation toolkit.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values, and a
//! `.env` file in the working directory is loaded before the environment
//! is read.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Default OpenAI-compatible API base.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com";

/// Default embedding model; its vectors have [`DEFAULT_EMBEDDING_DIMENSIONS`] entries.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Dimension of `text-embedding-3-small` vectors.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gpt-4o-mini")
    pub model: String,

    /// Maximum tokens for response (optional)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation (optional)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Embedding API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL for the embedding API. Empty means "same as the LLM".
    pub api_base: String,
    /// API key. Empty means "same as the LLM".
    pub api_key: String,
    /// Embedding model name.
    pub model: String,
    /// Vector dimension produced by the model.
    pub dimensions: usize,
    /// Number of texts sent per embedding request.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            batch_size: 64,
        }
    }
}

/// Qdrant vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// REST endpoint, e.g. "http://localhost:6333".
    pub url: String,
    /// Optional API key sent as the `api-key` header.
    pub api_key: Option<String>,
    /// Default collection name.
    pub collection: String,
    /// Name of the vector inside each point.
    pub vector_name: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: "documents".to_string(),
            vector_name: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

/// Settings shared by the evaluation stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Retrieval depths used when answering over several k values.
    pub k_values: Vec<usize>,
    /// Maximum characters per chunk at ingestion time.
    pub chunk_max_chars: usize,
    /// Model used for judging; falls back to the LLM model.
    pub judge_model: Option<String>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            k_values: vec![3, 5, 10, 15, 20],
            chunk_max_chars: 1000,
            judge_model: None,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM settings
    pub llm: LlmConfig,
    /// Embedding settings
    pub embedding: EmbeddingConfig,
    /// Vector store settings
    pub qdrant: QdrantConfig,
    /// Evaluation settings
    pub eval: EvalConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    embedding: Option<EmbeddingFileSection>,
    qdrant: Option<QdrantFileSection>,
    eval: Option<EvalFileSection>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    batch_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct QdrantFileSection {
    url: Option<String>,
    api_key: Option<String>,
    collection: Option<String>,
    vector_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvalFileSection {
    k_values: Option<Vec<usize>>,
    chunk_max_chars: Option<usize>,
    judge_model: Option<String>,
}

impl Config {
    /// Load configuration from `.env`, environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_KEY / OPENAI_API_KEY, LLM_MODEL, QDRANT_URL, ...)
    /// 2. Config file (~/.config/rag-eval/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env(|key| env::var(key).ok());
        config.resolve_embedding_defaults();

        Ok(config)
    }

    /// Apply overrides from an environment lookup function.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(api_base) = var("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }

        if let Some(api_key) = var("LLM_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
            self.llm.api_key = api_key;
        }

        if let Some(model) = var("LLM_MODEL") {
            self.llm.model = model;
        }

        if let Some(tokens) = var("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = tokens;
        }

        if let Some(temp) = var("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.llm.temperature = temp;
        }

        if let Some(model) = var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Some(dims) = var("EMBEDDING_DIMENSIONS").and_then(|v| v.parse().ok()) {
            self.embedding.dimensions = dims;
        }

        if let Some(url) = var("QDRANT_URL") {
            self.qdrant.url = url;
        }

        if let Some(key) = var("QDRANT_API_KEY") {
            self.qdrant.api_key = Some(key);
        }

        if let Some(collection) = var("RAG_COLLECTION") {
            self.qdrant.collection = collection;
        }

        if let Some(vector_name) = var("RAG_VECTOR_NAME") {
            self.qdrant.vector_name = vector_name;
        }

        if let Some(judge_model) = var("JUDGE_MODEL") {
            self.eval.judge_model = Some(judge_model);
        }
    }

    /// Embedding endpoint and key default to the LLM's.
    fn resolve_embedding_defaults(&mut self) {
        if self.embedding.api_base.is_empty() {
            self.embedding.api_base = self.llm.api_base.clone();
        }
        if self.embedding.api_key.is_empty() {
            self.embedding.api_key = self.llm.api_key.clone();
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse a YAML configuration document on top of the defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| EvalError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
        }

        if let Some(embedding) = file_config.embedding {
            if let Some(api_base) = embedding.api_base {
                config.embedding.api_base = api_base;
            }
            if let Some(api_key) = embedding.api_key {
                config.embedding.api_key = api_key;
            }
            if let Some(model) = embedding.model {
                config.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                config.embedding.dimensions = dimensions;
            }
            if let Some(batch_size) = embedding.batch_size {
                config.embedding.batch_size = batch_size;
            }
        }

        if let Some(qdrant) = file_config.qdrant {
            if let Some(url) = qdrant.url {
                config.qdrant.url = url;
            }
            config.qdrant.api_key = qdrant.api_key.or(config.qdrant.api_key);
            if let Some(collection) = qdrant.collection {
                config.qdrant.collection = collection;
            }
            if let Some(vector_name) = qdrant.vector_name {
                config.qdrant.vector_name = vector_name;
            }
        }

        if let Some(eval) = file_config.eval {
            if let Some(k_values) = eval.k_values {
                config.eval.k_values = k_values;
            }
            if let Some(max_chars) = eval.chunk_max_chars {
                config.eval.chunk_max_chars = max_chars;
            }
            config.eval.judge_model = eval.judge_model.or(config.eval.judge_model);
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rag-eval")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(EvalError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(EvalError::Config(
                "LLM API key is required. Set LLM_API_KEY or OPENAI_API_KEY, or add to config file."
                    .to_string(),
            ));
        }

        if self.llm.model.is_empty() {
            return Err(EvalError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(EvalError::Config(
                "Embedding dimensions must be greater than zero.".to_string(),
            ));
        }

        Ok(())
    }

    /// LLM settings for judging: the LLM config with the judge model swapped in.
    pub fn judge_llm(&self) -> LlmConfig {
        let mut llm = self.llm.clone();
        if let Some(model) = &self.eval.judge_model {
            llm.model = model.clone();
        }
        llm.temperature = 0.0;
        llm
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let mut config = Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                ..Default::default()
            },
            ..Default::default()
        };
        config.resolve_embedding_defaults();
        config
    }
}
