//! Embedding configuration resolved from the application config.

use placement_core::{AppConfig, ProviderConfig};
use serde::{Deserialize, Serialize};

/// Default Gemini task type; the same one is used for passages and queries
/// so both live in one vector space.
pub const DEFAULT_TASK_TYPE: &str = "RETRIEVAL_QUERY";

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "gemini", "ollama", "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom API base URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key for hosted providers
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Maximum texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Gemini task type hint
    #[serde(default = "default_task_type")]
    pub task_type: String,
}

fn default_batch_size() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_task_type() -> String {
    DEFAULT_TASK_TYPE.to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            api_key: None,
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            task_type: default_task_type(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the active embedding provider's settings.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let provider = config.embedding_provider.clone();
        let provider_config = config.get_provider_config(&provider);

        let mut resolved = Self {
            provider: provider.clone(),
            model: config.embedding_model.clone(),
            endpoint: provider_config
                .as_ref()
                .and_then(|p| p.endpoint().map(str::to_string)),
            api_key: config.resolve_api_key(&provider),
            timeout_secs: config.rag.request_timeout_secs,
            ..Default::default()
        };

        match (provider.as_str(), provider_config) {
            ("trigram", Some(ProviderConfig::Trigram { dimensions })) => {
                resolved.model = "trigram-v1".to_string();
                resolved.dimensions = dimensions;
            }
            ("trigram", _) => resolved.model = "trigram-v1".to_string(),
            ("ollama", Some(ProviderConfig::Ollama { timeout, .. })) => {
                resolved.dimensions = 768;
                if let Some(secs) = timeout {
                    resolved.timeout_secs = secs;
                }
            }
            _ => resolved.dimensions = 768,
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_from_app_config_gemini() {
        let app = AppConfig {
            api_key: Some("key".to_string()),
            ..Default::default()
        };

        let config = EmbeddingConfig::from_app_config(&app);
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.model, "models/embedding-001");
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.task_type, DEFAULT_TASK_TYPE);
    }

    #[test]
    fn test_from_app_config_trigram() {
        let app = AppConfig {
            embedding_provider: "trigram".to_string(),
            ..Default::default()
        };

        let config = EmbeddingConfig::from_app_config(&app);
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
    }
}
