//! Gemini embedding provider.
//!
//! Calls `models/{model}:batchEmbedContents`, splitting large inputs into
//! requests of at most `batch_size` texts.

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use placement_core::{AppError, AppResult};
use placement_llm::transport;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Hard limit of the batch endpoint
const MAX_BATCH: usize = 100;

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
    task_type: String,
    timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    embeddings: Vec<Embedding>,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

impl GeminiProvider {
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            AppError::Config(
                "Gemini embeddings require an API key (PLACEMENT_API_KEY or GOOGLE_API_KEY)"
                    .to_string(),
            )
        })?;

        let model = if config.model.starts_with("models/") {
            config.model.clone()
        } else {
            format!("models/{}", config.model)
        };

        Ok(Self {
            client: Client::new(),
            base_url: config
                .endpoint
                .as_deref()
                .unwrap_or(DEFAULT_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model,
            dimensions: config.dimensions,
            batch_size: config.batch_size.clamp(1, MAX_BATCH),
            task_type: config.task_type.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy used per request.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn to_request<'a>(&'a self, texts: &'a [String]) -> BatchRequest<'a> {
        BatchRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: &self.model,
                    content: Content {
                        parts: vec![Part { text }],
                    },
                    task_type: &self.task_type,
                })
                .collect(),
        }
    }

    async fn embed_group(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}/{}:batchEmbedContents", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&self.to_request(texts))
            .send()
            .await
            .map_err(|e| transport::request_error("Gemini", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(transport::status_error("Gemini", status, &body));
        }

        let body: BatchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Gemini embeddings: {}", e)))?;

        if body.embeddings.len() != texts.len() {
            return Err(AppError::Llm(format!(
                "Gemini returned {} embeddings for {} texts",
                body.embeddings.len(),
                texts.len()
            )));
        }

        body.embeddings
            .into_iter()
            .map(|e| {
                if e.values.len() == self.dimensions {
                    Ok(e.values)
                } else {
                    Err(AppError::Knowledge(format!(
                        "Gemini model '{}' returned {} dimensions, expected {}",
                        self.model,
                        e.values.len(),
                        self.dimensions
                    )))
                }
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "gemini", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for group in texts.chunks(self.batch_size) {
            debug!("Embedding {} texts", group.len());
            let vectors = self
                .retry
                .run("Gemini embedding", |_| self.embed_group(group))
                .await?;
            embeddings.extend(vectors);
        }

        Ok(embeddings)
    }
}
