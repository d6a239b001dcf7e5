use super::{EmbeddingProvider, EmbeddingSignature, FastEmbedManager, HashEmbedder};
use crate::config::{EmbeddingConfig, EmbeddingStrategy};
use crate::error::EmbeddingError;
use crate::types::EmbeddingSource;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sub-batches in flight at once
const MAX_CONCURRENT_BATCHES: usize = 4;
const DEFAULT_BATCH_SIZE: usize = 32;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A vector together with the strategy that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    pub vector: Vec<f32>,
    pub source: EmbeddingSource,
}

impl EmbeddingResult {
    pub fn is_fallback(&self) -> bool {
        self.source.is_fallback()
    }
}

/// Output of [`EmbeddingGenerator::embed_batch`], in input order
#[derive(Debug, Clone)]
pub struct BatchEmbedding {
    pub results: Vec<EmbeddingResult>,
    pub duration_ms: u64,
    /// Items that got a substitute zero vector instead of the provider's
    pub fallback_count: usize,
}

impl BatchEmbedding {
    pub fn fallback_ratio(&self) -> f32 {
        if self.results.is_empty() {
            0.0
        } else {
            self.fallback_count as f32 / self.results.len() as f32
        }
    }
}

/// Scale `vector` to unit length; the zero vector is left alone
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Runs the deployment's embedding provider off the async runtime
///
/// Provider calls happen on blocking threads under a timeout. A failing
/// sub-batch is retried one item at a time and items that still fail get a
/// zero vector tagged [`EmbeddingSource::Zero`], so one bad input never
/// aborts a document.
pub struct EmbeddingGenerator {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    timeout: Duration,
    normalize: bool,
}

impl EmbeddingGenerator {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: DEFAULT_TIMEOUT,
            normalize: true,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// L2-normalize model output (hash vectors are always unit length)
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Build the provider selected by `config.strategy`
    ///
    /// `auto` tries the model and settles on the hash embedder when the
    /// model cannot be loaded.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let cache_dir = Some(config.model_cache_dir.clone());
        let provider: Arc<dyn EmbeddingProvider> = match config.strategy {
            EmbeddingStrategy::Model => Arc::new(
                FastEmbedManager::from_model_name(&config.model_name, cache_dir)
                    .context("Embedding strategy 'model' requires a loadable model")?,
            ),
            EmbeddingStrategy::Hash => Arc::new(HashEmbedder::new(config.hash_dimension)),
            EmbeddingStrategy::Auto => {
                match FastEmbedManager::from_model_name(&config.model_name, cache_dir) {
                    Ok(manager) => Arc::new(manager),
                    Err(e) => {
                        tracing::warn!(
                            "Embedding model '{}' unavailable ({:#}); using hash embeddings",
                            config.model_name,
                            e
                        );
                        Arc::new(HashEmbedder::new(config.hash_dimension))
                    }
                }
            }
        };

        tracing::info!(
            "Embedding provider: {} ({}, dimension {})",
            provider.model_name(),
            provider.source(),
            provider.dimension()
        );

        Ok(Self::new(provider)
            .with_batch_size(config.batch_size)
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_normalize(config.normalize))
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn source(&self) -> EmbeddingSource {
        self.provider.source()
    }

    pub fn signature(&self) -> EmbeddingSignature {
        EmbeddingSignature::of(self.provider.as_ref())
    }

    /// Embed a single text; failures are returned, never papered over
    pub async fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        let mut vectors = self.run_provider(vec![text.to_string()]).await?;
        let vector = vectors.pop().ok_or(EmbeddingError::EmptyBatch)?;
        Ok(EmbeddingResult {
            vector,
            source: self.source(),
        })
    }

    /// Embed many texts, isolating per-item failures
    pub async fn embed_batch(&self, texts: Vec<String>) -> BatchEmbedding {
        let start = Instant::now();
        let total = texts.len();

        let batches: Vec<Vec<String>> = texts
            .chunks(self.batch_size)
            .map(|batch| batch.to_vec())
            .collect();

        let per_batch: Vec<Vec<EmbeddingResult>> = stream::iter(batches)
            .map(|batch| self.embed_sub_batch(batch))
            .buffered(MAX_CONCURRENT_BATCHES)
            .collect()
            .await;

        let results: Vec<EmbeddingResult> = per_batch.into_iter().flatten().collect();
        let fallback_count = results
            .iter()
            .filter(|r| r.source == EmbeddingSource::Zero)
            .count();
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "Embedded {} texts in {}ms ({} fallback)",
            total,
            duration_ms,
            fallback_count
        );

        BatchEmbedding {
            results,
            duration_ms,
            fallback_count,
        }
    }

    async fn embed_sub_batch(&self, batch: Vec<String>) -> Vec<EmbeddingResult> {
        let source = self.source();

        match self.run_provider(batch.clone()).await {
            Ok(vectors) => {
                return vectors
                    .into_iter()
                    .map(|vector| EmbeddingResult { vector, source })
                    .collect();
            }
            Err(e) if batch.len() > 1 => {
                tracing::warn!(
                    "Embedding batch of {} failed, retrying per item: {:#}",
                    batch.len(),
                    e
                );
            }
            Err(_) => {}
        }

        let mut results = Vec::with_capacity(batch.len());
        for text in batch {
            let outcome = self.run_provider(vec![text]).await.and_then(|mut vectors| {
                vectors
                    .pop()
                    .ok_or_else(|| anyhow::Error::new(EmbeddingError::EmptyBatch))
            });

            match outcome {
                Ok(vector) => results.push(EmbeddingResult { vector, source }),
                Err(e) => {
                    tracing::warn!("Substituting zero vector for a chunk: {:#}", e);
                    results.push(EmbeddingResult {
                        vector: vec![0.0; self.dimension()],
                        source: EmbeddingSource::Zero,
                    });
                }
            }
        }
        results
    }

    /// One provider call on a blocking thread, validated and normalized
    async fn run_provider(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let dimension = self.dimension();
        let provider = Arc::clone(&self.provider);

        let task = tokio::task::spawn_blocking(move || provider.embed_batch(texts));
        let joined = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| EmbeddingError::Timeout(self.timeout.as_secs()))?;
        let mut vectors = joined.context("Embedding task failed")??;

        if vectors.len() != expected {
            return Err(EmbeddingError::GenerationFailed(format!(
                "expected {} embeddings, got {}",
                expected,
                vectors.len()
            ))
            .into());
        }

        for vector in &mut vectors {
            if vector.len() != dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                }
                .into());
            }
            if self.normalize && self.source() == EmbeddingSource::Model {
                l2_normalize(vector);
            }
        }

        Ok(vectors)
    }
}
