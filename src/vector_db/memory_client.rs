//! In-memory vector index with brute-force cosine similarity

use super::{VectorDatabase, check_lengths};
use crate::types::{IndexedDocument, SearchHit};
use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

type ProjectDocs = BTreeMap<String, (IndexedDocument, Vec<f32>)>;

#[derive(Default)]
pub struct MemoryVectorDB {
    projects: RwLock<HashMap<String, ProjectDocs>>,
}

impl MemoryVectorDB {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of a project's live documents, sorted
    pub fn document_ids(&self, project: &str) -> Result<Vec<String>> {
        let projects = self.read()?;
        Ok(projects
            .get(project)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, ProjectDocs>>> {
        self.projects
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock on memory index: {}", e))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, ProjectDocs>>> {
        self.projects
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock on memory index: {}", e))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait::async_trait]
impl VectorDatabase for MemoryVectorDB {
    async fn initialize(&self, _dimension: usize) -> Result<()> {
        Ok(())
    }

    async fn upsert_documents(
        &self,
        project: &str,
        documents: Vec<IndexedDocument>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize> {
        check_lengths(&documents, &embeddings)?;
        let count = documents.len();

        let mut projects = self.write()?;
        let docs = projects.entry(project.to_string()).or_default();
        for (document, embedding) in documents.into_iter().zip(embeddings) {
            docs.insert(document.id.clone(), (document, embedding));
        }
        Ok(count)
    }

    async fn delete_documents(&self, project: &str, ids: &[String]) -> Result<usize> {
        let mut projects = self.write()?;
        let Some(docs) = projects.get_mut(project) else {
            return Ok(0);
        };
        Ok(ids.iter().filter(|id| docs.remove(*id).is_some()).count())
    }

    async fn search(
        &self,
        project: &str,
        query_vector: Vec<f32>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchHit>> {
        let projects = self.read()?;
        let Some(docs) = projects.get(project) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<SearchHit> = docs
            .values()
            .map(|(document, embedding)| SearchHit {
                id: document.id.clone(),
                text: document.text.clone(),
                metadata: document.metadata.clone(),
                score: cosine_similarity(&query_vector, embedding),
            })
            .filter(|hit| hit.score >= min_score)
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn count_documents(&self, project: &str) -> Result<usize> {
        Ok(self.read()?.get(project).map_or(0, |docs| docs.len()))
    }

    async fn clear_project(&self, project: &str) -> Result<usize> {
        Ok(self.write()?.remove(project).map_or(0, |docs| docs.len()))
    }
}
