//! Embedding providers and the generator the pipeline talks to
//!
//! A deployment uses exactly one provider: the fastembed model or the
//! deterministic hash embedder. [`EmbeddingSignature`] records which one
//! (and its dimension) so a corpus is never mixed.

mod fastembed_manager;
mod generator;
mod hash_embedder;

pub use fastembed_manager::FastEmbedManager;
pub use generator::{BatchEmbedding, EmbeddingGenerator, EmbeddingResult, l2_normalize};
pub use hash_embedder::HashEmbedder;

use crate::types::EmbeddingSource;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait for embedding generation
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of text
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Which strategy the vectors come from
    fn source(&self) -> EmbeddingSource {
        EmbeddingSource::Model
    }
}

/// Identity of the vectors stored in a corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSignature {
    pub source: EmbeddingSource,
    pub model: String,
    pub dimension: usize,
}

impl EmbeddingSignature {
    pub fn new(source: EmbeddingSource, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            source,
            model: model.into(),
            dimension,
        }
    }

    pub fn of(provider: &dyn EmbeddingProvider) -> Self {
        Self::new(provider.source(), provider.model_name(), provider.dimension())
    }
}

impl fmt::Display for EmbeddingSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.source, self.model, self.dimension)
    }
}
