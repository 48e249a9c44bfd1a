//! Multi-query expansion.
//!
//! The LLM rephrases the question so that distance-based search gets several
//! chances at chunks worded differently from the question. Expansion is an
//! optimisation: any failure degrades to the original question alone.

use std::collections::HashSet;
use std::sync::Arc;

use placement_core::AppResult;
use placement_llm::{LlmClient, LlmRequest};
use tracing::{debug, instrument, warn};

pub struct QueryExpander {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
}

impl QueryExpander {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.3,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Up to `n` variants, the original question first. `n <= 1` makes no LLM call.
    #[instrument(skip(self, question), fields(n = n))]
    pub async fn expand(&self, question: &str, n: usize) -> Vec<String> {
        if n <= 1 {
            return vec![question.to_string()];
        }

        match self.paraphrase(question, n - 1).await {
            Ok(Some(reply)) => {
                let variants = parse_variants(question, &reply, n);
                if variants.len() == 1 {
                    warn!("Query expansion produced no usable variants, using the original question");
                }
                debug!("Expanded into {} variants", variants.len());
                variants
            }
            Ok(None) => {
                warn!("Query expansion was blocked by the provider, using the original question");
                vec![question.to_string()]
            }
            Err(e) => {
                warn!("Query expansion failed, using the original question: {}", e);
                vec![question.to_string()]
            }
        }
    }

    async fn paraphrase(&self, question: &str, count: usize) -> AppResult<Option<String>> {
        let prompt = placement_prompt::expansion_prompt(question, count)?;
        let request = LlmRequest::new(prompt, self.model.clone()).with_temperature(self.temperature);

        let response = self.client.complete(&request).await?;
        if response.is_blocked() {
            return Ok(None);
        }
        Ok(Some(response.content))
    }
}

/// Original first, then one variant per non-empty reply line with list
/// markers removed, deduplicated case-insensitively, capped at `n`.
pub fn parse_variants(original: &str, reply: &str, n: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut variants = vec![original.to_string()];
    seen.insert(original.trim().to_lowercase());

    for line in reply.lines() {
        if variants.len() >= n {
            break;
        }

        let variant = strip_list_marker(line);
        if variant.is_empty() {
            continue;
        }
        if seen.insert(variant.to_lowercase()) {
            variants.push(variant.to_string());
        }
    }

    variants
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();

    // "1." or "2)" numbering
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return stripped.trim();
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use placement_core::AppError;
    use placement_llm::LlmResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLlm {
        reply: AppResult<LlmResponse>,
        calls: AtomicUsize,
    }

    impl FixedLlm {
        fn new(reply: AppResult<LlmResponse>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmClient for FixedLlm {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(response) => Ok(response.clone()),
                Err(e) => Err(AppError::Unavailable(e.to_string())),
            }
        }
    }

    #[test]
    fn test_parse_variants() {
        let reply = "1. What CGPA is required?\n\n2) what cgpa is required?\n- Minimum grade for eligibility?\n* Cutoff marks?";
        let variants = parse_variants("What is the CGPA cutoff?", reply, 3);
        assert_eq!(
            variants,
            vec![
                "What is the CGPA cutoff?",
                "What CGPA is required?",
                "Minimum grade for eligibility?",
            ]
        );
    }

    #[test]
    fn test_original_is_not_repeated() {
        let variants = parse_variants("CGPA cutoff?", "cgpa cutoff?\nGrade cutoff?", 4);
        assert_eq!(variants, vec!["CGPA cutoff?", "Grade cutoff?"]);
    }

    #[tokio::test]
    async fn test_single_variant_skips_llm() {
        let llm = FixedLlm::new(Ok(LlmResponse::text("unused", "m")));
        let expander = QueryExpander::new(llm.clone(), "m");

        assert_eq!(expander.expand("q", 1).await, vec!["q"]);
        assert_eq!(expander.expand("q", 0).await, vec!["q"]);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_degrades_to_original() {
        let failing = FixedLlm::new(Err(AppError::Unavailable("503".to_string())));
        let expander = QueryExpander::new(failing.clone(), "m");
        assert_eq!(expander.expand("q", 4).await, vec!["q"]);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);

        let blocked = FixedLlm::new(Ok(LlmResponse::blocked("m", "SAFETY")));
        let expander = QueryExpander::new(blocked, "m");
        assert_eq!(expander.expand("q", 4).await, vec!["q"]);
    }

    #[tokio::test]
    async fn test_expand_caps_at_n() {
        let llm = FixedLlm::new(Ok(LlmResponse::text("a?\nb?\nc?\nd?", "m")));
        let expander = QueryExpander::new(llm, "m");
        assert_eq!(expander.expand("q", 3).await, vec!["q", "a?", "b?"]);
    }
}
