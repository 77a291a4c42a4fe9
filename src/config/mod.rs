/// Configuration system for code-insight
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, InsightError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Language model used for summaries and answers
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector database configuration
    #[serde(default)]
    pub vector_db: VectorDbConfig,

    /// Source scanning rules
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Summarization fan-out and pacing
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Change detection policy
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Per-project state storage
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "gemini", "openai" (any OpenAI-compatible endpoint) or "disabled"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model identifier passed to the provider
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Override for the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Timeout in seconds for a single generation request
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on generated tokens per request
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Retries for rate-limited (429) or server-error responses
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_embedding_model")]
    pub model_name: String,

    /// Batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Timeout in seconds for one embedding batch
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Database backend: "lancedb" or "memory"
    #[serde(default = "default_db_backend")]
    pub backend: String,

    /// LanceDB data directory path
    #[serde(default = "default_lancedb_path")]
    pub lancedb_path: PathBuf,

    /// Table holding summary documents for all projects
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

/// Source scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// File extensions considered source files
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names never descended into (dot-directories are always skipped)
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    /// Maximum file size to scan (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Honor .gitignore and similar ignore files
    #[serde(default)]
    pub respect_gitignore: bool,
}

/// Summarizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Maximum summaries requested at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Requests-per-minute ceiling across one run (0 disables pacing)
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

/// Change detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DetectionConfig {
    /// Also emit method records for methods of wholly added or removed classes
    #[serde(default)]
    pub enumerate_class_methods: bool,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of summaries used as context
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity score (0.0 to 1.0)
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for per-project snapshots, summary stores and locks
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// How long to wait for another run on the same project
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_secs: u64,
}

// Default value functions
fn default_llm_provider() -> String {
    "gemini".to_string()
}

fn default_llm_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_llm_max_retries() -> u32 {
    2
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_db_backend() -> String {
    "lancedb".to_string()
}

fn default_lancedb_path() -> PathBuf {
    crate::paths::PlatformPaths::default_lancedb_path()
}

fn default_table_name() -> String {
    "code_summaries".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_exclude_dirs() -> Vec<String> {
    vec!["__pycache__".to_string(), "venv".to_string()]
}

fn default_max_file_size() -> usize {
    1_048_576 // 1 MB
}

fn default_max_concurrent() -> usize {
    4
}

fn default_requests_per_minute() -> u32 {
    50
}

fn default_top_k() -> usize {
    5
}

fn default_min_score() -> f32 {
    0.0
}

fn default_data_dir() -> PathBuf {
    crate::paths::PlatformPaths::app_data_dir()
}

fn default_lock_timeout() -> u64 {
    300
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout(),
            max_output_tokens: default_max_output_tokens(),
            max_retries: default_llm_max_retries(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_embedding_model(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: default_db_backend(),
            lancedb_path: default_lancedb_path(),
            table_name: default_table_name(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_dirs: default_exclude_dirs(),
            max_file_size: default_max_file_size(),
            respect_gitignore: false,
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            lock_timeout_secs: default_lock_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, InsightError> {
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

    /// Load configuration from default location or fall back to defaults
    pub fn load_or_default() -> Result<Self, InsightError> {
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
    pub fn save(&self, path: &Path) -> Result<(), InsightError> {
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
    pub fn validate(&self) -> Result<(), InsightError> {
        const PROVIDERS: [&str; 3] = ["gemini", "openai", "disabled"];
        if !PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(invalid(
                "llm.provider",
                format!(
                    "must be one of {}, got '{}'",
                    PROVIDERS.join(", "),
                    self.llm.provider
                ),
            ));
        }

        if self.llm.provider != "disabled" && self.llm.model.trim().is_empty() {
            return Err(invalid("llm.model", "must not be empty"));
        }

        if self.llm.timeout_secs == 0 {
            return Err(invalid("llm.timeout_secs", "must be greater than 0"));
        }

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

        if self.scanner.extensions.is_empty() {
            return Err(invalid("scanner.extensions", "must list at least one extension"));
        }

        if self.scanner.max_file_size == 0 {
            return Err(invalid("scanner.max_file_size", "must be greater than 0"));
        }

        if self.summarizer.max_concurrent == 0 {
            return Err(invalid("summarizer.max_concurrent", "must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.search.min_score) {
            return Err(invalid(
                "search.min_score",
                format!("must be between 0.0 and 1.0, got {}", self.search.min_score),
            ));
        }

        if self.search.top_k == 0 {
            return Err(invalid("search.top_k", "must be greater than 0"));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("CODE_INSIGHT_LLM_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("CODE_INSIGHT_LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(url) = std::env::var("CODE_INSIGHT_LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }

        if let Ok(backend) = std::env::var("CODE_INSIGHT_DB_BACKEND") {
            self.vector_db.backend = backend;
        }

        if let Ok(path) = std::env::var("CODE_INSIGHT_LANCEDB_PATH") {
            self.vector_db.lancedb_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("CODE_INSIGHT_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(path);
        }

        if let Ok(model) = std::env::var("CODE_INSIGHT_EMBEDDING_MODEL") {
            self.embedding.model_name = model;
        }

        if let Ok(value) = std::env::var("CODE_INSIGHT_MAX_CONCURRENT")
            && let Ok(max) = value.parse()
        {
            self.summarizer.max_concurrent = max;
        }

        if let Ok(value) = std::env::var("CODE_INSIGHT_REQUESTS_PER_MINUTE")
            && let Ok(rpm) = value.parse()
        {
            self.summarizer.requests_per_minute = rpm;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, InsightError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file, then apply environment overrides
    pub fn from_file_with_env(path: &Path) -> Result<Self, InsightError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> InsightError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}
