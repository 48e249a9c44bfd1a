//! Retrieval-augmented answering over the placement corpus.

pub mod answer;
pub mod compose;
pub mod expand;
pub mod pipeline;
pub mod retriever;
pub mod types;

pub use answer::{AnswerOutcome, Answerer};
pub use compose::{compose_prompt, passages};
pub use expand::QueryExpander;
pub use pipeline::{AnswerResult, ChatReply, RagPipeline, NO_QUESTION};
pub use retriever::{merge_results, Retrieval, RetrievalParams, Retriever};
pub use types::{source_refs, truncate_snippet, SourceRef};
