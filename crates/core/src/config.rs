//! Configuration management for the placement assistant.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.placement/config.yaml` in the workspace)
//! - Environment variables
//! - Command-line flags
//!
//! The workspace holds the corpus documents and the `.placement/` state
//! directory (persisted index, prompt overrides).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .placement/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// LLM provider used for answering and query expansion ("gemini", "ollama")
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// Embedding provider ("gemini", "ollama", "trigram")
    pub embedding_provider: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider configurations from config.yaml
    pub llm: Option<LlmConfig>,

    /// Retrieval and generation tuning
    pub rag: RagConfig,

    /// Retry policy for answer generation
    pub retry: RetryConfig,

    /// Corpus documents and index location
    pub corpus: CorpusConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Gemini {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
    Trigram {
        dimensions: usize,
    },
}

impl ProviderConfig {
    /// Custom endpoint, if the provider has one configured.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::Gemini { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
            ProviderConfig::Trigram { .. } => None,
        }
    }
}

/// Retrieval and generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RagConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks of one document
    pub chunk_overlap: usize,

    /// Number of query variants, the original question included
    pub query_variants: usize,

    /// Nearest neighbours fetched per variant
    pub k_per_variant: usize,

    /// Size of the merged retrieved set
    pub total_k: usize,

    /// Sampling temperature for answer generation
    pub temperature: f32,

    /// Deadline for a whole answer request, retries included
    pub request_timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 0,
            query_variants: 4,
            k_per_variant: 5,
            total_k: 8,
            temperature: 0.3,
            request_timeout_secs: 60,
        }
    }
}

impl RagConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("rag.chunkSize must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "rag.chunkOverlap ({}) must be smaller than rag.chunkSize ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.query_variants == 0 || self.k_per_variant == 0 || self.total_k == 0 {
            return Err(AppError::Config(
                "rag.queryVariants, rag.kPerVariant and rag.totalK must be positive".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::Config(format!(
                "rag.temperature must be within 0.0-2.0, got {}",
                self.temperature
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "rag.requestTimeoutSecs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Retry settings for provider calls (bounded attempts, growing delay).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Total attempts, the first call included
    pub max_attempts: u32,

    /// Lower bound of the wait between attempts, in milliseconds
    pub min_delay_ms: u64,

    /// Upper bound of the wait between attempts, in milliseconds
    pub max_delay_ms: u64,

    /// Scale applied to the exponential term (seconds)
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay_ms: 4_000,
            max_delay_ms: 10_000,
            multiplier: 1.0,
        }
    }
}

/// Corpus sources and persisted index location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CorpusConfig {
    /// Document files or directories, relative to the workspace
    pub documents: Vec<PathBuf>,

    /// SQLite index file; defaults to `.placement/index.sqlite`
    pub index_path: Option<PathBuf>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            documents: vec![
                PathBuf::from("quicklinks.pdf"),
                PathBuf::from("placement_details_complete.csv"),
            ],
            index_path: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    rag: Option<RagConfig>,
    retry: Option<RetryConfig>,
    corpus: Option<CorpusConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "gemini".to_string(),
            model: "gemini-1.5-pro".to_string(),
            embedding_provider: "gemini".to_string(),
            embedding_model: "models/embedding-001".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            rag: RagConfig::default(),
            retry: RetryConfig::default(),
            corpus: CorpusConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// Environment variables:
    /// - `PLACEMENT_WORKSPACE`: Override workspace path
    /// - `PLACEMENT_CONFIG`: Path to config file
    /// - `PLACEMENT_PROVIDER`: LLM provider
    /// - `PLACEMENT_MODEL`: Model identifier
    /// - `PLACEMENT_API_KEY`: API key (falls back to `GOOGLE_API_KEY`)
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use placement_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("PLACEMENT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("PLACEMENT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.state_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        if let Ok(provider) = std::env::var("PLACEMENT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("PLACEMENT_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("PLACEMENT_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            result.embedding_provider = llm.active_embedding_provider.clone();

            match llm.providers.get(&llm.active_provider) {
                Some(ProviderConfig::Gemini { model, .. })
                | Some(ProviderConfig::Ollama { model, .. }) => result.model = model.clone(),
                _ => {}
            }

            match llm.providers.get(&llm.active_embedding_provider) {
                Some(ProviderConfig::Gemini {
                    embedding_model: Some(model),
                    ..
                })
                | Some(ProviderConfig::Ollama {
                    embedding_model: Some(model),
                    ..
                }) => result.embedding_model = model.clone(),
                Some(ProviderConfig::Trigram { .. }) => {
                    result.embedding_model = "trigram-v1".to_string()
                }
                _ => {}
            }

            result.llm = Some(llm);
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }
        if let Some(retry) = config_file.retry {
            result.retry = retry;
        }
        if let Some(corpus) = config_file.corpus {
            result.corpus = corpus;
        }

        Ok(result)
    }

    /// Apply CLI overrides, giving flags precedence over environment and file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the `.placement` state directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(".placement")
    }

    /// Ensure the state directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .placement directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Location of the persisted vector index.
    pub fn index_path(&self) -> PathBuf {
        match self.corpus.index_path {
            Some(ref path) if path.is_absolute() => path.clone(),
            Some(ref path) => self.workspace.join(path),
            None => self.state_dir().join("index.sqlite"),
        }
    }

    /// Corpus document paths resolved against the workspace.
    pub fn document_paths(&self) -> Vec<PathBuf> {
        self.corpus
            .documents
            .iter()
            .map(|p| {
                if p.is_absolute() {
                    p.clone()
                } else {
                    self.workspace.join(p)
                }
            })
            .collect()
    }

    /// Get the configuration block for a provider, if one exists.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve the API key for a provider.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::Gemini { api_key_env, .. }) => std::env::var(api_key_env).ok(),
            _ => None,
        }
    }

    /// Validate configuration for the active providers.
    pub fn validate(&self) -> AppResult<()> {
        let known_llm = ["gemini", "ollama"];
        if !known_llm.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_llm.join(", ")
            )));
        }

        let known_embedding = ["gemini", "ollama", "trigram"];
        if !known_embedding.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                known_embedding.join(", ")
            )));
        }

        for provider in [&self.provider, &self.embedding_provider] {
            if provider == "gemini" && self.resolve_api_key(provider).is_none() {
                return Err(AppError::Config(
                    "Gemini requires an API key (PLACEMENT_API_KEY, GOOGLE_API_KEY or apiKeyEnv)"
                        .to_string(),
                ));
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "retry.maxAttempts must be at least 1".to_string(),
            ));
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            return Err(AppError::Config(format!(
                "retry.minDelayMs ({}) exceeds retry.maxDelayMs ({})",
                self.retry.min_delay_ms, self.retry.max_delay_ms
            )));
        }

        self.rag.validate()
    }
}
