//! In-process similarity ranking

use crate::error::EmbeddingError;
use crate::types::ScoredChunk;

/// Cosine similarity of two equally sized vectors
///
/// A zero vector has no direction, so its similarity to anything is 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Fail fast when a query cannot be compared with the corpus
pub fn check_dimension(expected: usize, actual: usize) -> Result<(), EmbeddingError> {
    if expected != actual {
        return Err(EmbeddingError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Order candidates by descending score and keep the best `k`
///
/// `candidates` must be in insertion order. Equal scores are broken by the
/// lower chunk index, then by insertion order. Scores below `threshold` (or
/// not finite) are dropped before the cut, so they never take a slot.
pub fn rank_top_k(
    candidates: Vec<ScoredChunk>,
    k: usize,
    threshold: Option<f32>,
) -> Vec<ScoredChunk> {
    let mut ranked: Vec<ScoredChunk> = candidates
        .into_iter()
        .filter(|c| c.score.is_finite())
        .filter(|c| threshold.is_none_or(|t| c.score >= t))
        .collect();

    // Stable sort keeps insertion order for full ties
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, ChunkMetadata};

    fn scored(document_id: &str, chunk_index: usize, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                document_id: document_id.to_string(),
                chunk_index,
                content: format!("chunk {}", chunk_index),
                metadata: ChunkMetadata::default(),
                embedding: None,
                embedding_source: None,
            },
            score,
        }
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![0.3, -0.2, 0.9];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_scale_invariant() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 4.0, 6.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_check_dimension() {
        assert!(check_dimension(384, 384).is_ok());
        assert!(matches!(
            check_dimension(384, 768),
            Err(EmbeddingError::DimensionMismatch { expected: 384, actual: 768 })
        ));
    }

    #[test]
    fn test_rank_orders_by_score() {
        let ranked = rank_top_k(
            vec![scored("a", 0, 0.2), scored("a", 1, 0.9), scored("a", 2, 0.5)],
            10,
            None,
        );
        let scores: Vec<f32> = ranked.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![0.9, 0.5, 0.2]);
    }

    #[test]
    fn test_rank_ties_by_chunk_index_then_insertion() {
        let ranked = rank_top_k(
            vec![
                scored("b", 3, 0.7),
                scored("a", 1, 0.7),
                scored("c", 1, 0.7),
                scored("a", 0, 0.7),
            ],
            10,
            None,
        );
        let order: Vec<(&str, usize)> = ranked
            .iter()
            .map(|c| (c.chunk.document_id.as_str(), c.chunk.chunk_index))
            .collect();
        assert_eq!(order, vec![("a", 0), ("a", 1), ("c", 1), ("b", 3)]);
    }

    #[test]
    fn test_rank_threshold_applies_before_limit() {
        let ranked = rank_top_k(
            vec![
                scored("a", 0, 0.95),
                scored("a", 1, 0.89),
                scored("a", 2, 0.91),
                scored("a", 3, 0.10),
            ],
            5,
            Some(0.9),
        );
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|c| c.score >= 0.9));
    }

    #[test]
    fn test_rank_limit_and_nan() {
        let ranked = rank_top_k(
            vec![scored("a", 0, f32::NAN), scored("a", 1, 0.3), scored("a", 2, 0.4)],
            1,
            None,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].chunk.chunk_index, 2);
        assert!(rank_top_k(vec![scored("a", 0, 0.5)], 0, None).is_empty());
    }
}
