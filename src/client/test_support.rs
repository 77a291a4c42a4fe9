//! Deterministic collaborators for exercising the client without models or network

use super::InsightClient;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::CollaboratorError;
use crate::llm::{Prompt, TextGenerator};
use crate::vector_db::MemoryVectorDB;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) const DIM: usize = 256;

/// Bag-of-words embedder: texts sharing words land close together
pub(crate) struct WordHashEmbedder;

impl EmbeddingProvider for WordHashEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; DIM];
                for word in text.split(|c: char| !c.is_alphanumeric()) {
                    if word.is_empty() {
                        continue;
                    }
                    let mut hasher = DefaultHasher::new();
                    word.to_lowercase().hash(&mut hasher);
                    vector[(hasher.finish() % DIM as u64) as usize] += 1.0;
                }
                vector
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "word-hash"
    }
}

/// Summarizes by echoing the unit's `def`/`class` line; fails on "boom"
#[derive(Default)]
pub(crate) struct ScriptedGenerator {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.user.clone());

        if prompt.user.contains("Question:") {
            return Ok("It renders widgets.".to_string());
        }
        if prompt.user.contains("boom") {
            return Err(CollaboratorError::Llm("scripted failure".to_string()));
        }
        let header = prompt
            .user
            .lines()
            .map(str::trim_start)
            .find(|l| l.starts_with("def ") || l.starts_with("class "))
            .unwrap_or("?");
        Ok(format!("Summary of {}", header))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Configuration keeping all state under `data_dir`, with pacing off
pub(crate) fn test_config(data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.llm.provider = "disabled".to_string();
    config.vector_db.backend = "memory".to_string();
    config.storage.data_dir = data_dir.to_path_buf();
    config.storage.lock_timeout_secs = 10;
    config.summarizer.requests_per_minute = 0;
    config
}

/// Client over the in-memory index and the scripted generator
pub(crate) async fn test_client(data_dir: &Path) -> InsightClient {
    InsightClient::with_components(
        test_config(data_dir),
        Arc::new(WordHashEmbedder),
        Arc::new(MemoryVectorDB::new()),
        Arc::new(ScriptedGenerator::default()),
    )
    .await
    .unwrap()
}
