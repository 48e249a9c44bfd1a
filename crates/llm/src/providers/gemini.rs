//! Gemini LLM provider implementation.
//!
//! Uses the Generative Language REST API:
//! https://ai.google.dev/api/generate-content

use std::time::Duration;

use placement_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::safety::SafetySetting;
use crate::transport;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Gemini LLM client.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client against the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_ENDPOINT, api_key)
    }

    /// Create a client against a custom endpoint.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            client: reqwest::Client::new(),
        }
    }

    /// Per-call HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn to_gemini_request(&self, request: &LlmRequest) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction: request.system.as_ref().map(|system| Content {
                role: None,
                parts: vec![Part {
                    text: system.clone(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
            safety_settings: request.safety.0.clone(),
        }
    }

    fn convert_response(&self, model: &str, response: GenerateResponse) -> AppResult<LlmResponse> {
        let model = response.model_version.unwrap_or_else(|| model.to_string());

        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Ok(LlmResponse::blocked(model, reason));
        }

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("Gemini returned no candidates".to_string()))?;

        if let Some(reason) = candidate.finish_reason.as_deref() {
            if matches!(reason, "SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT") {
                return Ok(LlmResponse::blocked(model, reason));
            }
        }

        let content = candidate
            .content
            .unwrap_or_default()
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = response
            .usage_metadata
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model,
            usage,
            blocked: None,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, request), fields(model = %request.model, prompt_len = request.prompt.len()))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending completion request to Gemini");

        let body = self.to_gemini_request(request);
        let model = request.model.trim_start_matches("models/");
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport::request_error("Gemini", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(transport::status_error("Gemini", status, &error_text));
        }

        let gemini_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| transport::request_error("Gemini", e))?;

        let converted = self.convert_response(&request.model, gemini_response)?;
        if let Some(ref reason) = converted.blocked {
            tracing::info!(reason = %reason, "Gemini withheld the response");
        } else {
            tracing::debug!(
                tokens = converted.usage.total_tokens,
                "Received completion from Gemini"
            );
        }
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::SafetySettings;

    #[test]
    fn test_request_conversion() {
        let client = GeminiClient::new("key");
        let request = LlmRequest::new("Hello", "gemini-1.5-pro")
            .with_temperature(0.3)
            .with_system("Be brief")
            .with_safety(SafetySettings::strict());

        let body = serde_json::to_value(client.to_gemini_request(&request)).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief");
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_prompt_block_is_reported() {
        let client = GeminiClient::new("key");
        let response: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();

        let converted = client.convert_response("gemini-1.5-pro", response).unwrap();
        assert_eq!(converted.blocked.as_deref(), Some("SAFETY"));
    }

    #[test]
    fn test_candidate_safety_finish_is_blocked() {
        let client = GeminiClient::new("key");
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"finishReason":"SAFETY","content":{"parts":[]}}]}"#,
        )
        .unwrap();

        assert!(client
            .convert_response("gemini-1.5-pro", response)
            .unwrap()
            .is_blocked());
    }

    #[test]
    fn test_text_is_joined() {
        let client = GeminiClient::new("key");
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"finishReason":"STOP","content":{"role":"model","parts":[{"text":"7.0 "},{"text":"CGPA"}]}}],
                "usageMetadata":{"promptTokenCount":10,"candidatesTokenCount":3}}"#,
        )
        .unwrap();

        let converted = client.convert_response("gemini-1.5-pro", response).unwrap();
        assert_eq!(converted.content, "7.0 CGPA");
        assert_eq!(converted.usage.total_tokens, 13);
    }

    #[test]
    fn test_no_candidates_is_error() {
        let client = GeminiClient::new("key");
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(client.convert_response("m", response).is_err());
    }
}
