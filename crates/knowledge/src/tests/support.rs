//! In-process stand-ins for the embedding and LLM providers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use placement_core::AppResult;
use placement_llm::{LlmClient, LlmRequest, LlmResponse};
use placement_prompt::NOT_IN_CONTEXT;

use crate::embeddings::EmbeddingProvider;
use crate::ingest::ReadyIndex;
use crate::rag::{Answerer, QueryExpander, RagPipeline, RetrievalParams, Retriever};
use crate::retry::RetryPolicy;
use crate::types::{meta, Chunk, IndexEntry};

const VOCABULARY: &[&str] = &[
    "cgpa",
    "eligibility",
    "required",
    "minimum",
    "grade",
    "lab",
    "course",
    "pass",
    "company",
    "ctc",
    "acme",
    "backlogs",
    "capital",
    "france",
    "football",
    "bread",
];

/// Counts vocabulary words; texts sharing words point the same way.
#[derive(Debug)]
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; VOCABULARY.len()];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            if let Some(i) = VOCABULARY.iter().position(|w| *w == token) {
                vector[i] += 1.0;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn provider_name(&self) -> &str {
        "keyword"
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

type Handler = dyn Fn(&LlmRequest, usize) -> AppResult<LlmResponse> + Send + Sync;

/// LLM whose replies come from a closure given the request and the 1-based call number.
pub struct ScriptedLlm {
    handler: Box<Handler>,
    calls: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(
        handler: impl Fn(&LlmRequest, usize) -> AppResult<LlmResponse> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Answer prompts only (expansion requests excluded).
    pub fn answer_requests(&self) -> Vec<LlmRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !is_expansion(r))
            .collect()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request, call)
    }
}

pub fn reply(text: &str) -> AppResult<LlmResponse> {
    Ok(LlmResponse::text(text, "scripted"))
}

pub fn is_expansion(request: &LlmRequest) -> bool {
    request
        .prompt
        .contains("different versions of the given user question")
}

/// Question section of an answer prompt, lowercased.
pub fn question_of(request: &LlmRequest) -> String {
    let prompt = request.prompt.as_str();
    let after = prompt
        .rfind("Question:")
        .map(|i| &prompt[i + "Question:".len()..])
        .unwrap_or(prompt);
    after
        .split("Answer:")
        .next()
        .unwrap_or(after)
        .trim()
        .to_lowercase()
}

/// Context section of an answer prompt.
pub fn context_of(request: &LlmRequest) -> String {
    let prompt = request.prompt.as_str();
    let start = prompt.find("Context:").map(|i| i + "Context:".len()).unwrap_or(0);
    let end = prompt.rfind("Question:").unwrap_or(prompt.len());
    prompt[start..end.max(start)].to_string()
}

/// A fact the oracle can answer: question keyword, evidence it needs in the
/// context, and the reply it gives when both are present.
pub struct Fact {
    pub keyword: &'static str,
    pub evidence: &'static str,
    pub answer: &'static str,
}

/// Answers only when the question asks about a known fact and the retrieved
/// context carries its evidence; otherwise gives the not-in-context phrase.
/// Expansion requests get `paraphrases` when the original contains the key.
pub fn grounded_oracle(
    facts: Vec<Fact>,
    paraphrases: Vec<(&'static str, &'static str)>,
) -> impl Fn(&LlmRequest, usize) -> AppResult<LlmResponse> + Send + Sync + 'static {
    move |request: &LlmRequest, _: usize| {
        if is_expansion(request) {
            let original = request
                .prompt
                .rsplit("Original question:")
                .next()
                .unwrap_or("")
                .to_lowercase();
            let lines: Vec<&str> = paraphrases
                .iter()
                .filter(|(key, _)| original.contains(key))
                .map(|(_, line)| *line)
                .collect();
            return reply(&lines.join("\n"));
        }

        let question = question_of(request);
        let context = context_of(request);
        match facts
            .iter()
            .find(|f| question.contains(f.keyword) && context.contains(f.evidence))
        {
            Some(fact) => reply(fact.answer),
            None => reply(NOT_IN_CONTEXT),
        }
    }
}

pub fn chunk(id: &str, source: &str, text: &str) -> Chunk {
    let mut metadata = BTreeMap::new();
    metadata.insert(meta::SOURCE.to_string(), source.to_string());
    Chunk {
        id: id.to_string(),
        document_id: id.to_string(),
        chunk_index: 0,
        text: text.to_string(),
        metadata,
    }
}

/// Index over `chunks` embedded with the keyword embedder.
pub fn keyword_index(chunks: Vec<Chunk>) -> ReadyIndex {
    let entries = chunks
        .into_iter()
        .map(|chunk| IndexEntry {
            embedding: KeywordEmbedder::vector(&chunk.text),
            chunk,
        })
        .collect();
    ReadyIndex::from_entries(entries).unwrap()
}

/// Millisecond-scale retry policy with 3 attempts.
pub fn fast_retry(delay_ms: u64) -> RetryPolicy {
    let delay = Duration::from_millis(delay_ms);
    RetryPolicy::new(3, delay, delay, delay)
}

pub fn pipeline(
    index: ReadyIndex,
    llm: Arc<ScriptedLlm>,
    params: RetrievalParams,
    retry: RetryPolicy,
) -> RagPipeline {
    let retriever = Retriever::new(
        index,
        Arc::new(KeywordEmbedder),
        QueryExpander::new(llm.clone(), "scripted"),
        params,
    );
    RagPipeline::new(retriever, Answerer::new(llm, "scripted").with_retry(retry))
}
