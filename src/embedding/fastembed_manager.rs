use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use anyhow::{Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Mutex;

/// Models selectable by name, with their output dimension
static SUPPORTED_MODELS: &[(&str, EmbeddingModel, usize)] = &[
    ("all-MiniLM-L6-v2", EmbeddingModel::AllMiniLML6V2, 384),
    ("all-MiniLM-L12-v2", EmbeddingModel::AllMiniLML12V2, 384),
    ("BAAI/bge-small-en-v1.5", EmbeddingModel::BGESmallENV15, 384),
    ("BAAI/bge-base-en-v1.5", EmbeddingModel::BGEBaseENV15, 768),
    ("BAAI/bge-large-en-v1.5", EmbeddingModel::BGELargeENV15, 1024),
    ("intfloat/multilingual-e5-small", EmbeddingModel::MultilingualE5Small, 384),
    ("intfloat/multilingual-e5-base", EmbeddingModel::MultilingualE5Base, 768),
];

/// FastEmbed-based embedding provider
pub struct FastEmbedManager {
    // fastembed's embed takes &mut self
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self> {
        Self::from_model_name("all-MiniLM-L6-v2", None)
    }

    /// Names accepted by [`from_model_name`](Self::from_model_name)
    pub fn supported_models() -> impl Iterator<Item = &'static str> {
        SUPPORTED_MODELS.iter().map(|(name, _, _)| *name)
    }

    /// Dimension of a supported model without loading it
    pub fn dimension_for(model_name: &str) -> Option<usize> {
        lookup(model_name).map(|(_, _, dimension)| *dimension)
    }

    /// Load a model by name, downloading it into `cache_dir` when missing
    pub fn from_model_name(model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self> {
        let (name, model, dimension) = lookup(model_name).ok_or_else(|| {
            EmbeddingError::InitializationFailed(format!(
                "unsupported model '{}' (supported: {})",
                model_name,
                Self::supported_models().collect::<Vec<_>>().join(", ")
            ))
        })?;

        tracing::info!("Initializing FastEmbed model: {}", name);

        let mut options = InitOptions::default();
        options.model_name = model.clone();
        options.show_download_progress = false;
        if let Some(dir) = cache_dir {
            options.cache_dir = dir;
        }

        let embedding_model =
            TextEmbedding::try_new(options).context("Failed to initialize FastEmbed model")?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            model_name: (*name).to_string(),
            dimension: *dimension,
        })
    }
}

fn lookup(model_name: &str) -> Option<&'static (&'static str, EmbeddingModel, usize)> {
    SUPPORTED_MODELS
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(model_name))
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::GenerationFailed("model lock poisoned".to_string()))?;
        let embeddings = model
            .embed(texts, None)
            .context("Failed to generate embeddings")?;

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_for_known_models() {
        assert_eq!(FastEmbedManager::dimension_for("all-MiniLM-L6-v2"), Some(384));
        assert_eq!(FastEmbedManager::dimension_for("baai/bge-base-en-v1.5"), Some(768));
        assert_eq!(FastEmbedManager::dimension_for("BAAI/bge-large-en-v1.5"), Some(1024));
        assert_eq!(FastEmbedManager::dimension_for("word2vec"), None);
    }

    #[test]
    fn test_unsupported_model_fails_without_download() {
        let err = FastEmbedManager::from_model_name("word2vec", None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("unsupported model"));
    }

    #[test]
    fn test_supported_models_listed() {
        let names: Vec<_> = FastEmbedManager::supported_models().collect();
        assert!(names.contains(&"all-MiniLM-L6-v2"));
    }

    // The tests below download the model on first run
    #[test]
    #[ignore]
    fn test_embedding_generation() {
        let manager = FastEmbedManager::new().unwrap();
        let texts = vec![
            "How do I reset my password?".to_string(),
            "Refunds are issued within 14 days.".to_string(),
        ];

        let embeddings = manager.embed_batch(texts).unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 384);
        assert_eq!(embeddings[1].len(), 384);
    }

    #[test]
    #[ignore]
    fn test_empty_batch() {
        let manager = FastEmbedManager::new().unwrap();
        let embeddings = manager.embed_batch(vec![]).unwrap();
        assert_eq!(embeddings.len(), 0);
    }

    #[test]
    #[ignore]
    fn test_model_name() {
        let manager = FastEmbedManager::new().unwrap();
        assert_eq!(manager.model_name(), "all-MiniLM-L6-v2");
        assert_eq!(manager.dimension(), 384);
    }
}
