//! Trigram embedding provider: deterministic, offline, content-aware vectors.

use crate::embeddings::provider::EmbeddingProvider;
use newsdesk_core::AppResult;
use std::collections::{BTreeMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "said", "says", "after", "over", "will",
];

/// Hashes word trigrams and whole words into a fixed number of buckets.
///
/// Not semantic in the neural sense, but articles sharing vocabulary land
/// close together, which is enough for offline use and tests.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
    stop_words: HashSet<&'static str>,
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    fn bucket(&self, bytes: &[u8], multiplier: u64) -> usize {
        let hash = bytes
            .iter()
            .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(*b as u64));
        (hash % self.dimensions as u64) as usize
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];
        let lower = text.to_lowercase();

        // BTreeMap keeps accumulation order stable so float sums are reproducible
        let mut word_freq: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .unicode_words()
            .filter(|w| w.chars().count() > 2 && !self.stop_words.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let dim = self.bucket(trigram.as_bytes(), 37);
                embedding[dim] += (*freq as f32).sqrt();
            }

            let dim = self.bucket(word.as_bytes(), 31);
            embedding[dim] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
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
        Ok(texts.iter().map(|text| self.generate(text)).collect())
    }
}
