//! Offline hashed-trigram embeddings.

use std::collections::BTreeMap;

use crate::embeddings::provider::EmbeddingProvider;
use placement_core::AppResult;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "does", "how",
];

/// Offline embedding provider hashing words and their character trigrams
/// into a fixed vector.
///
/// Deterministic and content-dependent but not semantic: useful for tests,
/// development and air-gapped ingestion, not for paraphrase recall.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, bytes: impl Iterator<Item = u8>, seed: u64) -> usize {
        let hash = bytes.fold(0u64, |acc, b| acc.wrapping_mul(seed).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let lower = text.to_lowercase();
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric() && c != '.')
            .map(|w| w.trim_matches('.'))
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        {
            *counts.entry(word).or_default() += 1;
        }

        for (word, count) in counts {
            let chars: Vec<char> = word.chars().collect();
            let weight = (count as f32).sqrt();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                vector[self.bucket(trigram.bytes(), 37)] += weight;
            }
            vector[self.bucket(word.bytes(), 31)] += count as f32;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }
}
