//! Ollama Embedding Provider
//!
//! Semantic embeddings via Ollama's local `/api/embeddings` endpoint, using
//! models like `nomic-embed-text`. The API takes one prompt per request, so
//! batches fan out a few requests at a time and are collected in input order.

use crate::embeddings::EmbeddingConfig;
use crate::embeddings::EmbeddingProvider;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use placement_core::{AppError, AppResult};
use placement_llm::transport;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Concurrent requests per batch
const MAX_IN_FLIGHT: usize = 4;

/// Ollama embedding provider using local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider from configuration.
    ///
    /// The endpoint falls back to `OLLAMA_URL`, then to the local default.
    /// No request is made until the first embedding.
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let base_url = config
            .endpoint
            .clone()
            .or_else(|| std::env::var("OLLAMA_URL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::new(),
            base_url,
            model: config.model.clone(),
            dimensions: config.dimensions,
            timeout: Duration::from_secs(config.timeout_secs),
            retry: RetryPolicy::new(
                3,
                Duration::from_millis(100),
                Duration::from_secs(2),
                Duration::from_millis(100),
            ),
        })
    }

    /// Embed single text (no retries)
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| transport::request_error("Ollama", e))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);

            return Err(transport::status_error("Ollama", status, &message));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        if body.embedding.len() != self.dimensions {
            return Err(AppError::Knowledge(format!(
                "Ollama model '{}' returned {} dimensions, expected {}",
                self.model,
                body.embedding.len(),
                self.dimensions
            )));
        }

        Ok(body.embedding)
    }

    async fn embed_retried(&self, text: &str) -> AppResult<Vec<f32>> {
        self.retry
            .run("Ollama embedding", |_| self.embed_single(text))
            .await
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Embedding batch of {} texts", texts.len());

        let pending: Vec<_> = texts.iter().map(|text| self.embed_retried(text)).collect();

        stream::iter(pending)
            .buffered(MAX_IN_FLIGHT)
            .try_collect()
            .await
    }
}
