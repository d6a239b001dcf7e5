/// Configuration system for faq-rag
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, RagError};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Vector store configuration
    #[serde(default)]
    pub vector_db: VectorDbConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking and indexing pipeline configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Retry policy for batch store operations
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Store backend: "lancedb" or "memory"
    #[serde(default = "default_db_backend")]
    pub backend: String,

    /// LanceDB data directory path
    #[serde(default = "default_lancedb_path")]
    pub lancedb_path: PathBuf,
}

/// Which embedding strategy the deployment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingStrategy {
    /// Always use the embedding model; fail startup if it cannot load
    Model,
    /// Always use deterministic hash embeddings
    Hash,
    /// Use the model when it loads, otherwise hash embeddings
    Auto,
}

impl std::str::FromStr for EmbeddingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "model" => Ok(EmbeddingStrategy::Model),
            "hash" => Ok(EmbeddingStrategy::Hash),
            "auto" => Ok(EmbeddingStrategy::Auto),
            other => Err(format!("unknown embedding strategy '{}'", other)),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding strategy for the whole corpus
    #[serde(default = "default_embedding_strategy")]
    pub strategy: EmbeddingStrategy,

    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Vector dimension of hash embeddings
    #[serde(default = "default_hash_dimension")]
    pub hash_dimension: usize,

    /// L2-normalize model output
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Timeout in seconds for one embedding batch
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Directory for downloaded model files
    #[serde(default = "default_model_cache_dir")]
    pub model_cache_dir: PathBuf,
}

/// Chunking and indexing pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Maximum raw document size in bytes
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,

    /// Fraction of fallback embeddings above which a document is flagged degraded
    #[serde(default = "default_max_fallback_ratio")]
    pub max_fallback_ratio: f32,

    /// Number of chunks written per store call
    #[serde(default = "default_write_batch_size")]
    pub write_batch_size: usize,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default result limit
    #[serde(default = "default_result_limit")]
    pub limit: usize,

    /// Threshold applied when a request does not supply one
    #[serde(default)]
    pub default_threshold: Option<f32>,
}

/// Retry configuration shared by all batch store operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for a single delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Growth factor between consecutive delays
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,
}

// Default value functions
fn default_db_backend() -> String {
    "lancedb".to_string()
}

fn default_lancedb_path() -> PathBuf {
    crate::paths::PlatformPaths::default_lancedb_path()
}

fn default_embedding_strategy() -> EmbeddingStrategy {
    EmbeddingStrategy::Auto
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_hash_dimension() -> usize {
    384
}

fn default_normalize() -> bool {
    true
}

fn default_batch_size() -> usize {
    32
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_model_cache_dir() -> PathBuf {
    crate::paths::PlatformPaths::default_model_cache_dir()
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_max_document_bytes() -> usize {
    10 * 1_048_576 // 10 MB
}

fn default_max_fallback_ratio() -> f32 {
    0.2
}

fn default_write_batch_size() -> usize {
    64
}

fn default_result_limit() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: default_db_backend(),
            lancedb_path: default_lancedb_path(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            strategy: default_embedding_strategy(),
            model_name: default_model_name(),
            hash_dimension: default_hash_dimension(),
            normalize: default_normalize(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
            model_cache_dir: default_model_cache_dir(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_document_bytes: default_max_document_bytes(),
            max_fallback_ratio: default_max_fallback_ratio(),
            write_batch_size: default_write_batch_size(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_result_limit(),
            default_threshold: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Build the retry policy described by this configuration
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
            self.multiplier,
        )
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, RagError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RagError> {
        if self.vector_db.backend != "lancedb" && self.vector_db.backend != "memory" {
            return Err(invalid(
                "vector_db.backend",
                format!(
                    "must be 'lancedb' or 'memory', got '{}'",
                    self.vector_db.backend
                ),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be greater than 0"));
        }

        if self.embedding.hash_dimension == 0 {
            return Err(invalid("embedding.hash_dimension", "must be greater than 0"));
        }

        if self.embedding.timeout_secs == 0 {
            return Err(invalid("embedding.timeout_secs", "must be greater than 0"));
        }

        if self.indexing.chunk_size == 0 {
            return Err(invalid("indexing.chunk_size", "must be greater than 0"));
        }

        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(invalid(
                "indexing.chunk_overlap",
                format!(
                    "must be smaller than chunk_size ({}), got {}",
                    self.indexing.chunk_size, self.indexing.chunk_overlap
                ),
            ));
        }

        if self.indexing.max_document_bytes == 0 {
            return Err(invalid("indexing.max_document_bytes", "must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.indexing.max_fallback_ratio) {
            return Err(invalid(
                "indexing.max_fallback_ratio",
                format!(
                    "must be between 0.0 and 1.0, got {}",
                    self.indexing.max_fallback_ratio
                ),
            ));
        }

        if self.indexing.write_batch_size == 0 {
            return Err(invalid("indexing.write_batch_size", "must be greater than 0"));
        }

        if self.search.limit == 0 || self.search.limit > crate::types::MAX_SEARCH_LIMIT {
            return Err(invalid(
                "search.limit",
                format!(
                    "must be between 1 and {}, got {}",
                    crate::types::MAX_SEARCH_LIMIT,
                    self.search.limit
                ),
            ));
        }

        if let Some(threshold) = self.search.default_threshold
            && !(-1.0..=1.0).contains(&threshold)
        {
            return Err(invalid(
                "search.default_threshold",
                format!("must be between -1.0 and 1.0, got {}", threshold),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }

        if self.retry.multiplier < 1.0 {
            return Err(invalid(
                "retry.multiplier",
                format!("must be at least 1.0, got {}", self.retry.multiplier),
            ));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var("FAQ_RAG_DB_BACKEND") {
            self.vector_db.backend = backend;
        }

        if let Ok(path) = std::env::var("FAQ_RAG_LANCEDB_PATH") {
            self.vector_db.lancedb_path = PathBuf::from(path);
        }

        if let Ok(strategy) = std::env::var("FAQ_RAG_EMBEDDING_STRATEGY")
            && let Ok(strategy) = strategy.parse()
        {
            self.embedding.strategy = strategy;
        }

        if let Ok(model) = std::env::var("FAQ_RAG_MODEL") {
            self.embedding.model_name = model;
        }

        if let Ok(batch_size) = std::env::var("FAQ_RAG_BATCH_SIZE")
            && let Ok(size) = batch_size.parse()
        {
            self.embedding.batch_size = size;
        }

        if let Ok(chunk_size) = std::env::var("FAQ_RAG_CHUNK_SIZE")
            && let Ok(size) = chunk_size.parse()
        {
            self.indexing.chunk_size = size;
        }

        if let Ok(overlap) = std::env::var("FAQ_RAG_CHUNK_OVERLAP")
            && let Ok(overlap) = overlap.parse()
        {
            self.indexing.chunk_overlap = overlap;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, RagError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> RagError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}
