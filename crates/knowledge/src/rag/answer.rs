//! Answer generation with safety settings and bounded retry.

use std::sync::Arc;

use placement_core::AppResult;
use placement_llm::{LlmClient, LlmRequest, LlmResponse, SafetySettings};
use placement_prompt::{ComposedPrompt, NOT_IN_CONTEXT, REFUSAL_MESSAGE};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::retry::RetryPolicy;

/// Lowercased openings of the refusal reply; the model sometimes drops the first sentence.
const REFUSAL_OPENINGS: &[&str] = &[
    "i'm here to assist with safe and respectful interactions",
    "your query goes against my guidelines",
];

/// Lowercased, without surrounding whitespace, quotes or punctuation.
fn normalize(reply: &str) -> String {
    reply
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// A reply that opens with `phrase`, optionally after "the".
fn opens_with(normalized: &str, phrase: &str) -> bool {
    normalized.starts_with(phrase)
        || normalized
            .strip_prefix("the ")
            .map_or(false, |rest| rest.starts_with(phrase))
}

/// What the model did with a grounded prompt. Failures are errors, not outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnswerOutcome {
    Answered { answer: String },
    /// Provider block (`reason` set) or the model's own refusal reply
    Refused { reason: Option<String> },
    NoAnswerInContext,
}

impl AnswerOutcome {
    /// Text shown to the user.
    pub fn text(&self) -> &str {
        match self {
            AnswerOutcome::Answered { answer } => answer,
            AnswerOutcome::Refused { .. } => REFUSAL_MESSAGE,
            AnswerOutcome::NoAnswerInContext => NOT_IN_CONTEXT,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnswerOutcome::Answered { .. } => "answered",
            AnswerOutcome::Refused { .. } => "refused",
            AnswerOutcome::NoAnswerInContext => "no_answer_in_context",
        }
    }

    /// Classify a provider response. The fixed replies count only when the
    /// reply opens with them; an answer that quotes them stays an answer.
    pub fn from_response(response: &LlmResponse) -> Self {
        if let Some(reason) = &response.blocked {
            return AnswerOutcome::Refused {
                reason: Some(reason.clone()),
            };
        }

        let text = response.content.trim();
        let normalized = normalize(text);
        if normalized.is_empty() || opens_with(&normalized, NOT_IN_CONTEXT) {
            return AnswerOutcome::NoAnswerInContext;
        }
        if REFUSAL_OPENINGS
            .iter()
            .any(|opening| normalized.starts_with(opening))
        {
            return AnswerOutcome::Refused { reason: None };
        }

        AnswerOutcome::Answered {
            answer: text.to_string(),
        }
    }
}

pub struct Answerer {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    safety: SafetySettings,
    retry: RetryPolicy,
}

impl Answerer {
    /// Temperature 0.3, strict safety thresholds, default retry policy.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.3,
            safety: SafetySettings::strict(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_safety(mut self, safety: SafetySettings) -> Self {
        self.safety = safety;
        self
    }

    /// Generate and classify an answer. Transient provider failures are
    /// retried per the policy; exhaustion surfaces as `AppError::Unavailable`.
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.text().len()))]
    pub async fn answer(&self, prompt: &ComposedPrompt) -> AppResult<AnswerOutcome> {
        let request = LlmRequest::new(prompt.text(), self.model.clone())
            .with_temperature(self.temperature)
            .with_safety(self.safety.clone());

        let response = self
            .retry
            .run("Answer generation", |_| self.client.complete(&request))
            .await?;

        let outcome = AnswerOutcome::from_response(&response);
        info!("Answer outcome: {}", outcome.kind());
        tracing::debug!("Raw answer: {}", response.content);

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_responses() {
        assert_eq!(
            AnswerOutcome::from_response(&LlmResponse::blocked("m", "SAFETY")),
            AnswerOutcome::Refused {
                reason: Some("SAFETY".to_string())
            }
        );
        assert_eq!(
            AnswerOutcome::from_response(&LlmResponse::text(REFUSAL_MESSAGE, "m")),
            AnswerOutcome::Refused { reason: None }
        );
        assert_eq!(
            AnswerOutcome::from_response(&LlmResponse::text("Answer is not in the context.", "m")),
            AnswerOutcome::NoAnswerInContext
        );
        assert_eq!(
            AnswerOutcome::from_response(&LlmResponse::text("  ", "m")),
            AnswerOutcome::NoAnswerInContext
        );
        assert_eq!(
            AnswerOutcome::from_response(&LlmResponse::text(" A CGPA of 7.0.\n", "m")),
            AnswerOutcome::Answered {
                answer: "A CGPA of 7.0.".to_string()
            }
        );
    }

    #[test]
    fn test_fixed_phrases_count_only_at_the_start() {
        for reply in [
            "\"Answer is not in the context.\"",
            "The answer is not in the context",
            "answer is not in the context; the documents cover 2024 only.",
        ] {
            assert_eq!(
                AnswerOutcome::from_response(&LlmResponse::text(reply, "m")),
                AnswerOutcome::NoAnswerInContext,
                "{}",
                reply
            );
        }
        assert_eq!(
            AnswerOutcome::from_response(&LlmResponse::text(
                "Your query goes against my guidelines.",
                "m"
            )),
            AnswerOutcome::Refused { reason: None }
        );

        let quoting = [
            "Last year's answer is not in the context of the 2024 rules; a CGPA of 7.0 now applies.",
            "The placement cell says abusive emails go against my guidelines and lead to a ban.",
            "Rule 4: any offer that goes against my guidelines, as a student, may be declined.",
        ];
        for reply in quoting {
            assert_eq!(
                AnswerOutcome::from_response(&LlmResponse::text(reply, "m")),
                AnswerOutcome::Answered {
                    answer: reply.to_string()
                },
                "{}",
                reply
            );
        }
    }

    #[test]
    fn test_outcome_text_and_serialization() {
        assert_eq!(AnswerOutcome::NoAnswerInContext.text(), NOT_IN_CONTEXT);
        assert_eq!(AnswerOutcome::Refused { reason: None }.text(), REFUSAL_MESSAGE);

        let json = serde_json::to_value(AnswerOutcome::Answered {
            answer: "7.0".to_string(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "answered");
        assert_eq!(json["answer"], "7.0");
    }
}
