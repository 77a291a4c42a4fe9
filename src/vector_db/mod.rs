// LanceDB is the default embedded vector database
pub mod lance_client;
pub use lance_client::LanceVectorDB;

// In-process brute-force index, for tests and throwaway runs
pub mod memory_client;
pub use memory_client::MemoryVectorDB;

use crate::config::VectorDbConfig;
use crate::types::{IndexedDocument, SearchHit};
use anyhow::{Result, bail};
use std::sync::Arc;

/// Trait for vector database operations
///
/// Every operation is scoped to one project; document ids are only unique within it.
#[async_trait::async_trait]
pub trait VectorDatabase: Send + Sync {
    /// Initialize the database and create collections if needed
    async fn initialize(&self, dimension: usize) -> Result<()>;

    /// Store documents with their embeddings, replacing any live document with the same id
    async fn upsert_documents(
        &self,
        project: &str,
        documents: Vec<IndexedDocument>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize>;

    /// Delete documents by id; unknown ids are ignored. Returns how many were removed
    async fn delete_documents(&self, project: &str, ids: &[String]) -> Result<usize>;

    /// Top `limit` documents by similarity, best first
    async fn search(
        &self,
        project: &str,
        query_vector: Vec<f32>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchHit>>;

    /// Number of live documents in a project
    async fn count_documents(&self, project: &str) -> Result<usize>;

    /// Delete every document of a project
    async fn clear_project(&self, project: &str) -> Result<usize>;
}

/// Open the backend selected by `vector_db.backend`
pub async fn create_vector_db(config: &VectorDbConfig) -> Result<Arc<dyn VectorDatabase>> {
    match config.backend.as_str() {
        "lancedb" => {
            let db_path = config.lancedb_path.to_string_lossy();
            let db = LanceVectorDB::with_table(&db_path, &config.table_name).await?;
            Ok(Arc::new(db))
        }
        "memory" => {
            tracing::warn!("Using in-memory vector index; documents are lost on exit");
            Ok(Arc::new(MemoryVectorDB::new()))
        }
        other => bail!("Unknown vector database backend: {}", other),
    }
}

pub(crate) fn check_lengths(documents: &[IndexedDocument], embeddings: &[Vec<f32>]) -> Result<()> {
    if documents.len() != embeddings.len() {
        bail!(
            "Got {} documents but {} embeddings",
            documents.len(),
            embeddings.len()
        );
    }
    Ok(())
}
