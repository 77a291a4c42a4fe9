use super::EmbeddingProvider;
use anyhow::{Context, Result, anyhow};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// Embedding models selectable by name in `embedding.model_name`
const MODELS: &[(&str, EmbeddingModel, usize)] = &[
    ("all-MiniLM-L6-v2", EmbeddingModel::AllMiniLML6V2, 384),
    ("all-MiniLM-L12-v2", EmbeddingModel::AllMiniLML12V2, 384),
    ("bge-small-en-v1.5", EmbeddingModel::BGESmallENV15, 384),
    ("bge-base-en-v1.5", EmbeddingModel::BGEBaseENV15, 768),
];

/// Resolve a configured model name to the fastembed model and its dimension
///
/// Accepts the short name or the Hugging Face id (`sentence-transformers/...`, `BAAI/...`).
pub fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize, &'static str)> {
    let short = name.rsplit('/').next().unwrap_or(name);
    MODELS
        .iter()
        .find(|(known, _, _)| known.eq_ignore_ascii_case(short))
        .map(|(known, model, dimension)| (model.clone(), *dimension, *known))
        .ok_or_else(|| {
            let supported: Vec<&str> = MODELS.iter().map(|(n, _, _)| *n).collect();
            anyhow!(
                "Unsupported embedding model '{}' (supported: {})",
                name,
                supported.join(", ")
            )
        })
}

/// FastEmbed-based embedding provider
pub struct FastEmbedManager {
    model: Mutex<TextEmbedding>,
    dimension: usize,
    name: &'static str,
}

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self> {
        Self::from_model_name("all-MiniLM-L6-v2")
    }

    /// Create a FastEmbedManager for a configured model name
    pub fn from_model_name(name: &str) -> Result<Self> {
        let (model, dimension, name) = resolve_model(name)?;
        tracing::info!("Initializing FastEmbed model: {}", name);

        let options = InitOptions::new(model).with_show_download_progress(true);
        let embedding_model =
            TextEmbedding::try_new(options).context("Failed to initialize FastEmbed model")?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            dimension,
            name,
        })
    }
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
            .map_err(|_| anyhow!("Embedding model lock poisoned"))?;
        let embeddings = model
            .embed(texts, None)
            .context("Failed to generate embeddings")?;

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        self.name
    }
}
