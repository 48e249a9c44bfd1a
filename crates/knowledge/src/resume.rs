//! Resume to job description matching.
//!
//! The model is asked for a fixed JSON shape and the reply is validated
//! strictly. A malformed reply is answered with a correction prompt, up to
//! the retry policy's attempt count. Each provider call is retried on its
//! own under the same policy.

use std::path::Path;
use std::sync::Arc;

use placement_core::{AppError, AppResult};
use placement_llm::{LlmClient, LlmRequest, SafetySettings};
use placement_prompt::{resume_correction_prompt, resume_prompt, ResumePromptKind};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::parser::extract_pdf_text;
use crate::retry::RetryPolicy;

/// Match percentage only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuickMatch {
    #[serde(deserialize_with = "percentage")]
    pub jd_match: u8,
}

/// Full ATS-style evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetailedMatch {
    #[serde(deserialize_with = "percentage")]
    pub jd_match: u8,
    pub missing_keywords: Vec<String>,
    pub profile_summary: String,
    pub strengths: String,
    pub weaknesses: String,
    pub recommended_courses: String,
}

/// Accepts `85`, `85.0`, `"85"` or `"85%"`; rejects values outside 0..=100.
fn percentage<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Int(v) => v as f64,
        Raw::Float(v) => v,
        Raw::Text(s) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("jd_match is not a percentage: {:?}", s)))?,
    };

    if !(0.0..=100.0).contains(&value) {
        return Err(de::Error::custom(format!(
            "jd_match must be between 0 and 100, got {}",
            value
        )));
    }

    Ok(value.round() as u8)
}

/// The JSON object in a reply, without code fences or surrounding prose.
fn extract_json(reply: &str) -> &str {
    let trimmed = reply.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Parse and validate a reply, describing the problem on failure.
pub fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T, String> {
    serde_json::from_str(extract_json(reply)).map_err(|e| e.to_string())
}

/// Text of a resume PDF.
pub fn extract_resume_text(path: &Path) -> AppResult<String> {
    let text = extract_pdf_text(path)?;
    if text.trim().is_empty() {
        return Err(AppError::InvalidInput(format!(
            "No text could be extracted from resume {:?}",
            path
        )));
    }
    Ok(text)
}

pub struct ResumeMatcher {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl ResumeMatcher {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.3,
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

    pub async fn quick_match(&self, resume: &str, job: &str) -> AppResult<QuickMatch> {
        self.evaluate(resume, job, ResumePromptKind::Quick).await
    }

    pub async fn detailed_match(&self, resume: &str, job: &str) -> AppResult<DetailedMatch> {
        self.evaluate(resume, job, ResumePromptKind::Detailed).await
    }

    #[instrument(skip(self, resume, job), fields(kind = ?kind, model = %self.model))]
    async fn evaluate<T: DeserializeOwned>(
        &self,
        resume: &str,
        job: &str,
        kind: ResumePromptKind,
    ) -> AppResult<T> {
        if resume.trim().is_empty() {
            return Err(AppError::InvalidInput("Resume text is empty".to_string()));
        }
        if job.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Job description is empty".to_string(),
            ));
        }

        let base = resume_prompt(resume, job, kind)?;
        let mut prompt = base.clone();
        let max_attempts = self.retry.max_attempts;
        let mut attempt = 1;

        loop {
            let request = LlmRequest::new(prompt.clone(), self.model.clone())
                .with_temperature(self.temperature)
                .with_safety(SafetySettings::strict());

            let response = self
                .retry
                .run("Resume evaluation", |_| self.client.complete(&request))
                .await?;

            if let Some(reason) = response.blocked {
                return Err(AppError::Llm(format!(
                    "Resume evaluation was blocked by the provider: {}",
                    reason
                )));
            }

            match parse_reply::<T>(&response.content) {
                Ok(parsed) => {
                    info!("Resume evaluated on attempt {}", attempt);
                    return Ok(parsed);
                }
                Err(problem) if attempt < max_attempts => {
                    warn!(
                        "Resume evaluation reply was malformed (attempt {}/{}): {}",
                        attempt, max_attempts, problem
                    );
                    prompt = resume_correction_prompt(&base, &problem)?;
                    attempt += 1;
                }
                Err(problem) => {
                    return Err(AppError::InvalidInput(format!(
                        "Resume evaluation reply was invalid after {} attempts: {}",
                        max_attempts, problem
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use placement_llm::LlmResponse;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays canned replies in order and records the prompts it saw.
    struct ReplayLlm {
        replies: Mutex<Vec<AppResult<LlmResponse>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ReplayLlm {
        fn new(mut replies: Vec<AppResult<LlmResponse>>) -> Arc<Self> {
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ReplayLlm {
        fn provider_name(&self) -> &str {
            "replay"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(AppError::Other("no more replies".to_string())))
        }
    }

    fn matcher(llm: Arc<ReplayLlm>) -> ResumeMatcher {
        ResumeMatcher::new(llm, "m").with_retry(RetryPolicy::new(
            3,
            Duration::from_millis(1),
            Duration::from_millis(2),
            Duration::from_millis(1),
        ))
    }

    fn text(reply: &str) -> AppResult<LlmResponse> {
        Ok(LlmResponse::text(reply, "m"))
    }

    #[test]
    fn test_percentage_forms() {
        let parsed: QuickMatch = parse_reply("```json\n{\"jd_match\": \"85%\"}\n```").unwrap();
        assert_eq!(parsed.jd_match, 85);

        let parsed: QuickMatch = parse_reply("{\"jd_match\": 72.4}").unwrap();
        assert_eq!(parsed.jd_match, 72);

        assert!(parse_reply::<QuickMatch>("{\"jd_match\": 140}").is_err());
        assert!(parse_reply::<QuickMatch>("{\"jd_match\": 50, \"extra\": 1}").is_err());
        assert!(parse_reply::<QuickMatch>("no json here").is_err());
    }

    #[test]
    fn test_detailed_shape() {
        let reply = r#"Here you go:
{
  "jd_match": 64,
  "missing_keywords": ["Kubernetes", "Go"],
  "profile_summary": "Backend developer",
  "strengths": "APIs",
  "weaknesses": "No cloud experience",
  "recommended_courses": "CKAD"
}"#;
        let parsed: DetailedMatch = parse_reply(reply).unwrap();
        assert_eq!(parsed.jd_match, 64);
        assert_eq!(parsed.missing_keywords, vec!["Kubernetes", "Go"]);

        assert!(parse_reply::<DetailedMatch>("{\"jd_match\": 64}").is_err());
    }

    #[tokio::test]
    async fn test_malformed_reply_is_reprompted() {
        let llm = ReplayLlm::new(vec![text("about 80 percent"), text("{\"jd_match\": 80}")]);
        let result = matcher(llm.clone()).quick_match("resume", "job").await.unwrap();

        assert_eq!(result.jd_match, 80);
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].starts_with(&prompts[0]));
        assert!(prompts[1].contains("could not be used"));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let llm = ReplayLlm::new(vec![
            Err(AppError::Unavailable("503".to_string())),
            text("{\"jd_match\": 55}"),
        ]);
        let result = matcher(llm.clone()).quick_match("resume", "job").await.unwrap();
        assert_eq!(result.jd_match, 55);
        assert_eq!(llm.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_persistent_outage_is_unavailable() {
        let llm = ReplayLlm::new(vec![
            Err(AppError::Unavailable("503".to_string())),
            Err(AppError::Unavailable("503".to_string())),
            Err(AppError::Unavailable("503".to_string())),
            text("{\"jd_match\": 55}"),
        ]);
        let err = matcher(llm.clone()).quick_match("resume", "job").await.unwrap_err();

        assert!(matches!(err, AppError::Unavailable(_)), "got {:?}", err);
        assert_eq!(llm.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_outage_then_malformed_reply_still_reprompts() {
        let llm = ReplayLlm::new(vec![
            Err(AppError::Timeout("deadline".to_string())),
            text("eighty"),
            text("{\"jd_match\": 80}"),
        ]);
        let result = matcher(llm.clone()).quick_match("resume", "job").await.unwrap();

        assert_eq!(result.jd_match, 80);
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[0], prompts[1]);
        assert!(prompts[2].contains("could not be used"));
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let llm = ReplayLlm::new(vec![text("nope"), text("still nope"), text("never"), text("{\"jd_match\": 1}")]);
        let err = matcher(llm.clone()).quick_match("resume", "job").await.unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(llm.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_inputs_are_rejected() {
        let llm = ReplayLlm::new(vec![]);
        let m = matcher(llm.clone());

        assert!(matches!(m.quick_match("  ", "job").await, Err(AppError::InvalidInput(_))));
        assert!(matches!(m.detailed_match("resume", "").await, Err(AppError::InvalidInput(_))));
        assert!(llm.prompts().is_empty());
    }
}
