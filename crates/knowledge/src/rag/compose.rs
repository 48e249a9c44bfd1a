//! Bridge from retrieved chunks to the grounded answer prompt.

use placement_core::AppResult;
use placement_prompt::{ComposedPrompt, ContextPassage, PromptDefinition};

use crate::types::RetrievedSet;

/// Context passages in rank order, each tagged with its chunk's provenance.
pub fn passages(set: &RetrievedSet) -> Vec<ContextPassage> {
    set.chunks
        .iter()
        .map(|r| ContextPassage::new(r.chunk.label(), r.chunk.text.clone()))
        .collect()
}

/// Compose the answer prompt for `question` over `set`.
pub fn compose_prompt(
    question: &str,
    set: &RetrievedSet,
    definition: Option<&PromptDefinition>,
) -> AppResult<ComposedPrompt> {
    placement_prompt::compose(question, &passages(set), definition)
}
