//! Command handlers for the placement CLI.

pub mod ask;
pub mod ingest;
pub mod matching;
pub mod stats;

pub use ask::AskCommand;
pub use ingest::IngestCommand;
pub use matching::MatchCommand;
pub use stats::StatsCommand;

use std::sync::Arc;

use placement_core::{config::AppConfig, AppError, AppResult};
use placement_knowledge::embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
use placement_llm::{create_client, LlmClient};

/// Embedding provider for the configured embedding backend.
pub(crate) fn embedder(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    create_provider(&EmbeddingConfig::from_app_config(config))
}

/// Generation client for the configured provider.
pub(crate) fn llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let endpoint = config
        .get_provider_config(&config.provider)
        .and_then(|pc| pc.endpoint().map(str::to_string));

    create_client(
        &config.provider,
        endpoint.as_deref(),
        config.resolve_api_key(&config.provider).as_deref(),
        Some(config.rag.request_timeout()),
    )
}

pub(crate) fn print_json(value: &serde_json::Value) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
