//! Question answering orchestration and the request boundary contract.
//!
//! question -> expander -> variants -> retriever -> merged top-k -> composer
//! -> answerer -> outcome. Each request runs under its own deadline; when it
//! elapses the in-flight future is dropped, which also stops any retry loop.

use std::sync::Arc;
use std::time::Duration;

use placement_core::{AppConfig, AppError, AppResult};
use placement_llm::LlmClient;
use placement_prompt::PromptDefinition;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::embeddings::EmbeddingProvider;
use crate::ingest::ReadyIndex;
use crate::rag::answer::{AnswerOutcome, Answerer};
use crate::rag::compose::compose_prompt;
use crate::rag::expand::QueryExpander;
use crate::rag::retriever::{RetrievalParams, Retriever};
use crate::rag::types::{source_refs, SourceRef};
use crate::retry::RetryPolicy;
use crate::types::RetrievedSet;

/// Error text for an empty or missing question.
pub const NO_QUESTION: &str = "No question provided";

/// Everything produced for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub request_id: String,
    pub question: String,
    pub variants: Vec<String>,
    #[serde(flatten)]
    pub outcome: AnswerOutcome,
    pub retrieved: RetrievedSet,
    pub sources: Vec<SourceRef>,
}

impl AnswerResult {
    pub fn answer(&self) -> &str {
        self.outcome.text()
    }
}

/// Reply body at the request boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatReply {
    Ok {
        answer: String,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl ChatReply {
    /// Status code and body for an answer request's result.
    pub fn from_result(result: &AppResult<AnswerResult>) -> (u16, ChatReply) {
        match result {
            Ok(answer) => (
                200,
                ChatReply::Ok {
                    answer: answer.answer().to_string(),
                },
            ),
            Err(AppError::InvalidInput(message)) => (
                400,
                ChatReply::Error {
                    error: message.clone(),
                    details: None,
                },
            ),
            Err(e) => {
                tracing::error!("Request failed: {}", e);
                (
                    e.status_code(),
                    ChatReply::Error {
                        error: e.public_message().to_string(),
                        details: Some(e.to_string()),
                    },
                )
            }
        }
    }
}

pub struct RagPipeline {
    retriever: Retriever,
    answerer: Answerer,
    prompt_override: Option<PromptDefinition>,
    request_timeout: Duration,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, answerer: Answerer) -> Self {
        Self {
            retriever,
            answerer,
            prompt_override: None,
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Wire a pipeline from configuration around an already built index.
    ///
    /// Loads the workspace answer prompt override, if one exists.
    pub fn from_config(
        config: &AppConfig,
        index: ReadyIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        client: Arc<dyn LlmClient>,
    ) -> AppResult<Self> {
        let expander =
            QueryExpander::new(client.clone(), config.model.clone()).with_temperature(config.rag.temperature);
        let retriever = Retriever::new(
            index,
            embedder,
            expander,
            RetrievalParams::from_config(&config.rag),
        );
        let answerer = Answerer::new(client, config.model.clone())
            .with_temperature(config.rag.temperature)
            .with_retry(RetryPolicy::from_config(&config.retry));

        Ok(Self::new(retriever, answerer)
            .with_prompt_override(placement_prompt::answer_definition(&config.workspace)?)
            .with_request_timeout(config.rag.request_timeout()))
    }

    pub fn with_prompt_override(mut self, definition: Option<PromptDefinition>) -> Self {
        self.prompt_override = definition;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer with the configured retrieval parameters.
    pub async fn ask(&self, question: &str) -> AppResult<AnswerResult> {
        self.ask_with(question, self.retriever.params()).await
    }

    /// Answer under the request deadline.
    pub async fn ask_with(&self, question: &str, params: RetrievalParams) -> AppResult<AnswerResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput(NO_QUESTION.to_string()));
        }

        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("ask", request_id = %request_id);

        match tokio::time::timeout(
            self.request_timeout,
            self.run(request_id.clone(), question, params).instrument(span),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "Request {} exceeded its {}s deadline",
                request_id,
                self.request_timeout.as_secs_f64()
            ))),
        }
    }

    /// Boundary form of `ask`: status code and reply body.
    pub async fn chat(&self, question: Option<&str>) -> (u16, ChatReply) {
        let result = match question {
            Some(q) => self.ask(q).await,
            None => Err(AppError::InvalidInput(NO_QUESTION.to_string())),
        };
        ChatReply::from_result(&result)
    }

    async fn run(
        &self,
        request_id: String,
        question: &str,
        params: RetrievalParams,
    ) -> AppResult<AnswerResult> {
        info!("Answering question: {}", question);

        let retrieval = self.retriever.retrieve_with(question, params).await?;
        let prompt = compose_prompt(question, &retrieval.set, self.prompt_override.as_ref())?;
        let outcome = self.answerer.answer(&prompt).await?;

        Ok(AnswerResult {
            request_id,
            question: question.to_string(),
            variants: retrieval.variants,
            outcome,
            sources: source_refs(&retrieval.set),
            retrieved: retrieval.set,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(outcome: AnswerOutcome) -> AnswerResult {
        AnswerResult {
            request_id: "r".to_string(),
            question: "q".to_string(),
            variants: vec!["q".to_string()],
            outcome,
            retrieved: RetrievedSet::default(),
            sources: vec![],
        }
    }

    #[test]
    fn test_provider_rejection_is_a_server_error() {
        let rejected = placement_llm::transport::status_error(
            "Gemini",
            reqwest::StatusCode::BAD_REQUEST,
            "API key not valid. Please pass a valid API key.",
        );
        let (status, reply) = ChatReply::from_result(&Err(rejected));

        assert_eq!(status, 500);
        match reply {
            ChatReply::Error { error, details } => {
                assert!(!error.contains("API key"), "provider body leaked: {}", error);
                assert!(details.unwrap().contains("API key not valid"));
            }
            other => panic!("expected an error reply, got {:?}", other),
        }
    }

    #[test]
    fn test_chat_reply_status_mapping() {
        let (status, reply) = ChatReply::from_result(&Ok(result(AnswerOutcome::Answered {
            answer: "7.0".to_string(),
        })));
        assert_eq!(status, 200);
        assert_eq!(reply, ChatReply::Ok { answer: "7.0".to_string() });

        let (status, reply) =
            ChatReply::from_result(&Err(AppError::InvalidInput(NO_QUESTION.to_string())));
        assert_eq!(status, 400);
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            serde_json::json!({"error": "No question provided"})
        );

        let (status, reply) =
            ChatReply::from_result(&Err(AppError::Unavailable("after 3 attempts".to_string())));
        assert_eq!(status, 503);
        match reply {
            ChatReply::Error { error, details } => {
                assert_eq!(
                    error,
                    "Service temporarily unavailable. Please try again in a few moments."
                );
                assert!(details.unwrap().contains("after 3 attempts"));
            }
            other => panic!("unexpected reply: {:?}", other),
        }

        let (status, _) = ChatReply::from_result(&Err(AppError::Knowledge("boom".to_string())));
        assert_eq!(status, 500);
    }

    #[test]
    fn test_refusal_answers_with_fixed_text() {
        let (status, reply) =
            ChatReply::from_result(&Ok(result(AnswerOutcome::Refused { reason: None })));
        assert_eq!(status, 200);
        assert_eq!(
            reply,
            ChatReply::Ok {
                answer: placement_prompt::REFUSAL_MESSAGE.to_string()
            }
        );
    }
}
