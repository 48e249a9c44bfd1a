//! LLM provider factory.
//!
//! Resolves a provider name plus its settings into a shared client.

use std::sync::Arc;
use std::time::Duration;

use placement_core::{AppError, AppResult};

use crate::client::LlmClient;
use crate::providers::{gemini, GeminiClient, OllamaClient};

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("gemini", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by Gemini
/// * `timeout` - Optional per-call HTTP timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "gemini" | "google" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("Gemini provider requires an API key".to_string())
            })?;
            let mut client =
                GeminiClient::with_base_url(endpoint.unwrap_or(gemini::DEFAULT_ENDPOINT), api_key);
            if let Some(timeout) = timeout {
                client = client.with_timeout(timeout);
            }
            Ok(Arc::new(client))
        }
        "ollama" => {
            let mut client = OllamaClient::with_base_url(endpoint.unwrap_or("http://localhost:11434"));
            if let Some(timeout) = timeout {
                client = client.with_timeout(timeout);
            }
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}
