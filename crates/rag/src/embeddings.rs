//! Text Embeddings
//!
//! Hashes character unigrams, character bigrams and words into a fixed
//! number of buckets. Cheap and deterministic; close paraphrases share most
//! buckets, unrelated sentences share few.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use kiosk_agent_config::constants::semantic;
use unicode_segmentation::UnicodeSegmentation;

/// Embedding configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Embedding dimension
    pub embedding_dim: usize,
    /// Normalize embeddings to unit length
    pub normalize: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            embedding_dim: semantic::EMBEDDING_DIM,
            normalize: true,
        }
    }
}

/// Feature-hashing embedder
#[derive(Debug, Clone, Default)]
pub struct HashEmbedder {
    config: EmbeddingConfig,
}

impl HashEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    pub fn dimension(&self) -> usize {
        self.config.embedding_dim
    }

    fn bucket(&self, feature: &str, salt: u8) -> usize {
        let mut hasher = DefaultHasher::new();
        salt.hash(&mut hasher);
        feature.hash(&mut hasher);
        (hasher.finish() % self.config.embedding_dim.max(1) as u64) as usize
    }

    /// Embed a text. Punctuation and case are ignored.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.config.embedding_dim.max(1)];

        let lowered = text.to_lowercase();
        for word in lowered.unicode_words() {
            embedding[self.bucket(word, 0)] += 1.0;

            let chars: Vec<char> = word.chars().collect();
            for c in &chars {
                embedding[self.bucket(&c.to_string(), 1)] += 0.5;
            }
            for pair in chars.windows(2) {
                let bigram: String = pair.iter().collect();
                embedding[self.bucket(&bigram, 2)] += 1.0;
            }
        }

        if self.config.normalize {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut embedding {
                    *v /= norm;
                }
            }
        }

        embedding
    }
}

/// Squared Euclidean distance
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedder() {
        let embedder = HashEmbedder::new(EmbeddingConfig::default());
        let embedding = embedder.embed("안녕하세요");

        assert_eq!(embedding.len(), 256);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_punctuation_and_case_ignored() {
        let embedder = HashEmbedder::default();
        assert_eq!(embedder.embed("안녕하세요!"), embedder.embed("안녕하세요"));
        assert_eq!(embedder.embed("Hello"), embedder.embed("hello"));
    }

    #[test]
    fn test_similar_texts_are_closer() {
        let embedder = HashEmbedder::default();
        let base = embedder.embed("화장실 어디예요");
        let near = embedder.embed("화장실 어디에요");
        let far = embedder.embed("아메리카노 주세요");
        assert!(squared_l2(&base, &near) < squared_l2(&base, &far));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::default();
        assert!(embedder.embed("").iter().all(|v| *v == 0.0));
    }
}
