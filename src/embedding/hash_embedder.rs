use super::EmbeddingProvider;
use crate::types::EmbeddingSource;
use anyhow::Result;
use sha2::{Digest, Sha256};

const HASH_MODEL_NAME: &str = "hash-v1";
const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic feature-hashing embedder
///
/// Each lowercased word and each character trigram of a word is hashed with
/// SHA-256 into one of `dimension` buckets with a ±1 sign, and the result is
/// L2-normalized. There is no semantic knowledge here: texts sharing words
/// land close together, nothing more. Text without any word yields the zero
/// vector.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Embed a single text
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            self.add_feature(&mut vector, "w", word, WORD_WEIGHT);

            let chars: Vec<char> = word.chars().collect();
            if chars.len() > 3 {
                for window in chars.windows(3) {
                    let trigram: String = window.iter().collect();
                    self.add_feature(&mut vector, "t", &trigram, TRIGRAM_WEIGHT);
                }
            }
        }

        super::l2_normalize(&mut vector);
        vector
    }

    fn add_feature(&self, vector: &mut [f32], namespace: &str, feature: &str, weight: f32) {
        let mut hasher = Sha256::new();
        hasher.update(namespace.as_bytes());
        hasher.update([0u8]);
        hasher.update(feature.as_bytes());
        let digest = hasher.finalize();

        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(index_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };

        vector[index] += sign * weight;
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        HASH_MODEL_NAME
    }

    fn source(&self) -> EmbeddingSource {
        EmbeddingSource::Hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_db::cosine_similarity;

    #[test]
    fn test_dimension_and_determinism() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_one("How do I return an item?");
        let b = embedder.embed_one("How do I return an item?");
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unit_length() {
        let embedder = HashEmbedder::new(128);
        let v = embedder.embed_one("Shipping takes three to five business days");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(16);
        assert!(embedder.embed_one("  ?! ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashEmbedder::new(384);
        let query = embedder.embed_one("refund policy for damaged items");
        let related = embedder.embed_one("Our refund policy covers damaged items");
        let unrelated = embedder.embed_one("Store opening hours on public holidays");

        assert!(
            cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated)
        );
    }

    #[test]
    fn test_case_insensitive() {
        let embedder = HashEmbedder::new(32);
        assert_eq!(embedder.embed_one("Refund"), embedder.embed_one("refund"));
    }

    #[test]
    fn test_provider_interface() {
        let embedder = HashEmbedder::new(32);
        let out = embedder
            .embed_batch(vec!["a".to_string(), "b c".to_string()])
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(embedder.source(), EmbeddingSource::Hash);
        assert_eq!(embedder.model_name(), "hash-v1");
        assert_eq!(HashEmbedder::new(0).dimension(), 1);
    }
}
