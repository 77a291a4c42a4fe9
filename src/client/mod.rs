//! Core library client for code-insight
//!
//! This module provides the main client interface for using code-insight
//! as a library in your own Rust applications.

mod fs_lock;
mod ingest;
mod project_lock;
mod query;
#[cfg(test)]
pub(crate) mod test_support;

pub use fs_lock::FsLockGuard;

use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider, FastEmbedManager};
use crate::error::{CollaboratorError, InsightError, NotFoundError, ValidationError};
use crate::llm::{self, Prompt, TextGenerator};
use crate::paths::PlatformPaths;
use crate::summarizer::Summarizer;
use crate::types::*;
use crate::vector_db::{self, VectorDatabase};
use anyhow::Context;
use project_lock::ProjectLocks;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Main client for ingesting projects and asking questions about them
///
/// The client owns the three collaborators (embedding model, vector index and
/// language model) and the per-project run locks. It is used directly as a library
/// or wrapped by the MCP server and the CLI.
///
/// # Example
///
/// ```no_run
/// use code_insight::{InsightClient, IngestRequest, AskRequest};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = InsightClient::new().await?;
///
///     let ingest = client
///         .ingest(IngestRequest {
///             path: "/path/to/code".to_string(),
///             project: "my-project".to_string(),
///         })
///         .await?;
///     println!("{} changes detected", ingest.changes_detected);
///
///     let answer = client
///         .ask(AskRequest {
///             project: "my-project".to_string(),
///             question: "Where is the configuration parsed?".to_string(),
///             top_k: None,
///         })
///         .await?;
///     println!("{}", answer.answer);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InsightClient {
    pub(crate) embedding_provider: Arc<dyn EmbeddingProvider>,
    pub(crate) vector_db: Arc<dyn VectorDatabase>,
    pub(crate) generator: Arc<dyn TextGenerator>,
    pub(crate) summarizer: Arc<Summarizer>,
    pub(crate) config: Arc<Config>,
    locks: Arc<ProjectLocks>,
}

impl InsightClient {
    /// Create a client with configuration from the default locations
    pub async fn new() -> Result<Self, InsightError> {
        let config = Config::new()?;
        Self::with_config(config).await
    }

    /// Create a client with the collaborators described by `config`
    pub async fn with_config(config: Config) -> Result<Self, InsightError> {
        tracing::info!("Initializing code-insight client");
        tracing::debug!("LLM: {} ({})", config.llm.provider, config.llm.model);
        tracing::debug!("Vector DB backend: {}", config.vector_db.backend);
        tracing::debug!("Embedding model: {}", config.embedding.model_name);

        let embedding_provider: Arc<dyn EmbeddingProvider> = Arc::new(
            FastEmbedManager::from_model_name(&config.embedding.model_name)
                .context("Failed to initialize embedding provider")?,
        );
        let vector_db = vector_db::create_vector_db(&config.vector_db)
            .await
            .context("Failed to initialize vector database")?;
        let generator = llm::create_generator(&config.llm)?;

        Self::with_components(config, embedding_provider, vector_db, generator).await
    }

    /// Create a client from explicitly constructed collaborators
    pub async fn with_components(
        config: Config,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_db: Arc<dyn VectorDatabase>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, InsightError> {
        config.validate()?;

        vector_db
            .initialize(embedding_provider.dimension())
            .await
            .context("Failed to initialize vector database collections")?;

        let summarizer = Arc::new(Summarizer::new(
            generator.clone(),
            &config.summarizer,
            &config.llm,
        ));
        let locks = Arc::new(ProjectLocks::new(
            PlatformPaths::lock_dir(&config.storage.data_dir),
            Duration::from_secs(config.storage.lock_timeout_secs),
        ));

        tracing::info!("Using data directory: {:?}", config.storage.data_dir);

        Ok(Self {
            embedding_provider,
            vector_db,
            generator,
            summarizer,
            config: Arc::new(config),
            locks,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the embedding dimension used by this client
    pub fn embedding_dimension(&self) -> usize {
        self.embedding_provider.dimension()
    }

    /// Canonical absolute form of an input directory
    pub fn normalize_path(path: &str) -> Result<PathBuf, InsightError> {
        let path_buf = PathBuf::from(path);
        if !path_buf.exists() {
            return Err(NotFoundError::Directory(path.to_string()).into());
        }
        if !path_buf.is_dir() {
            return Err(NotFoundError::NotADirectory(path.to_string()).into());
        }
        std::fs::canonicalize(&path_buf)
            .with_context(|| format!("Failed to canonicalize path: {}", path))
            .map_err(Into::into)
    }

    pub(crate) fn data_dir(&self) -> &Path {
        &self.config.storage.data_dir
    }

    pub(crate) fn snapshot_path(&self, project: &str) -> PathBuf {
        PlatformPaths::snapshot_path(self.data_dir(), project)
    }

    pub(crate) fn summary_store_path(&self, project: &str) -> PathBuf {
        PlatformPaths::summary_store_path(self.data_dir(), project)
    }

    /// Fail with `NotFound` for projects that were never ingested
    pub(crate) fn require_project(&self, project: &str) -> Result<(), InsightError> {
        if self.snapshot_path(project).exists() || self.summary_store_path(project).exists() {
            Ok(())
        } else {
            Err(NotFoundError::Project(project.to_string()).into())
        }
    }

    /// Embed documents and store them; the caller deletes stale ids first
    pub(crate) async fn index_documents(
        &self,
        project: &str,
        documents: Vec<IndexedDocument>,
    ) -> Result<usize, CollaboratorError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let embeddings = embedding::embed_texts(
            self.embedding_provider.clone(),
            texts,
            self.config.embedding.batch_size,
            Duration::from_secs(self.config.embedding.timeout_secs),
        )
        .await?;

        self.vector_db
            .upsert_documents(project, documents, embeddings)
            .await
            .map_err(|e| CollaboratorError::Index(format!("{:#}", e)))
    }

    /// Embed a query and return the project's closest documents
    pub(crate) async fn retrieve(
        &self,
        project: &str,
        query: &str,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchHit>, CollaboratorError> {
        let query_vector = embedding::embed_query(
            self.embedding_provider.clone(),
            query,
            Duration::from_secs(self.config.embedding.timeout_secs),
        )
        .await?;

        self.vector_db
            .search(project, query_vector, limit, min_score)
            .await
            .map_err(|e| CollaboratorError::Index(format!("{:#}", e)))
    }

    pub(crate) async fn generate(&self, prompt: &Prompt) -> Result<String, CollaboratorError> {
        let timeout = Duration::from_secs(self.config.llm.timeout_secs);
        tokio::time::timeout(timeout, self.generator.generate(prompt))
            .await
            .map_err(|_| CollaboratorError::Timeout(timeout.as_secs()))?
    }

    /// Detect changes in a project directory and bring summaries and index up to date
    ///
    /// Runs for the same project are serialized. The stored snapshot is only
    /// replaced after summaries and index are updated, so a failed run is simply
    /// retried.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestResponse, InsightError> {
        request.validate().map_err(ValidationError::Request)?;
        ingest::ingest_project(self, request).await
    }

    /// Answer a question from the project's indexed summaries
    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse, InsightError> {
        request.validate().map_err(ValidationError::Request)?;
        query::ask(self, request).await
    }

    /// Return the summaries closest to a query without generating an answer
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, InsightError> {
        request.validate().map_err(ValidationError::Request)?;
        query::search(self, request).await
    }

    /// Tracked files, stored summaries and live documents of a project
    pub async fn status(&self, request: ProjectRequest) -> Result<StatusResponse, InsightError> {
        request.validate().map_err(ValidationError::Request)?;
        query::status(self, request).await
    }

    /// Re-project every stored summary into the search index
    pub async fn rebuild_index(
        &self,
        request: ProjectRequest,
    ) -> Result<RebuildResponse, InsightError> {
        request.validate().map_err(ValidationError::Request)?;
        query::rebuild_index(self, request).await
    }

    /// Delete a project's snapshot, summaries and index documents
    pub async fn clear(&self, request: ProjectRequest) -> Result<ClearResponse, InsightError> {
        request.validate().map_err(ValidationError::Request)?;
        query::clear(self, request).await
    }
}
