mod fastembed_manager;

pub use fastembed_manager::FastEmbedManager;

use crate::error::CollaboratorError;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of text
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Embed texts in sub-batches on the blocking pool, each bounded by `timeout`
///
/// Output order matches input order. Any failed or timed-out batch fails the whole call.
pub async fn embed_texts(
    provider: Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
    batch_size: usize,
    timeout: Duration,
) -> Result<Vec<Vec<f32>>, CollaboratorError> {
    let mut embeddings = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        let provider = provider.clone();
        let batch = batch.to_vec();
        let expected = batch.len();
        let embed_future = tokio::task::spawn_blocking(move || provider.embed_batch(batch));

        let batch_embeddings = match tokio::time::timeout(timeout, embed_future).await {
            Ok(Ok(Ok(batch_embeddings))) => batch_embeddings,
            Ok(Ok(Err(e))) => return Err(CollaboratorError::Embedding(format!("{:#}", e))),
            Ok(Err(e)) => {
                return Err(CollaboratorError::Embedding(format!(
                    "Embedding task panicked: {}",
                    e
                )));
            }
            Err(_) => return Err(CollaboratorError::Timeout(timeout.as_secs())),
        };

        if batch_embeddings.len() != expected {
            return Err(CollaboratorError::Embedding(format!(
                "Expected {} embeddings, got {}",
                expected,
                batch_embeddings.len()
            )));
        }
        embeddings.extend(batch_embeddings);
    }

    Ok(embeddings)
}

/// Embed one query string
pub async fn embed_query(
    provider: Arc<dyn EmbeddingProvider>,
    query: &str,
    timeout: Duration,
) -> Result<Vec<f32>, CollaboratorError> {
    embed_texts(provider, vec![query.to_string()], 1, timeout)
        .await?
        .pop()
        .ok_or_else(|| CollaboratorError::Embedding("No embedding generated".to_string()))
}
