//! LLM summaries for changed units
//!
//! Tasks are built from the units parsed in the same run, fanned out with bounded
//! concurrency and paced to a requests-per-minute ceiling. A failed call never fails
//! the run: the unit gets [`SUMMARY_UNAVAILABLE`] and is counted as a failure.

pub mod prompts;

use crate::config::{LlmConfig, SummarizerConfig};
use crate::error::CollaboratorError;
use crate::indexer::ParsedFile;
use crate::llm::TextGenerator;
use crate::summary_store::SummaryRecord;
use crate::types::{ChangeKind, ChangeRecord, UnitId, UnitKind};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Stored in place of a summary when generation fails
pub const SUMMARY_UNAVAILABLE: &str = "Error: Could not generate summary.";

/// One unit to summarize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryTask {
    pub kind: UnitKind,
    pub file_path: String,
    pub class_name: Option<String>,
    pub name: String,
    pub source: String,
    /// Owning class docstring, methods only
    pub class_docstring: Option<String>,
}

impl SummaryTask {
    pub fn unit_id(&self) -> UnitId {
        UnitId::new(&self.file_path, self.class_name.as_deref(), &self.name)
    }
}

/// Build summary tasks for every added or modified unit
///
/// `parsed` maps relative file paths to this run's parse results. Changes whose unit
/// cannot be found are skipped with a warning.
pub fn plan_tasks(
    changes: &[ChangeRecord],
    parsed: &BTreeMap<String, ParsedFile>,
) -> Vec<SummaryTask> {
    let mut tasks = Vec::new();

    for change in changes {
        if change.change_type == ChangeKind::Removed {
            continue;
        }

        let task = parsed
            .get(&change.file_path)
            .and_then(|file| task_for(file, change));

        match task {
            Some(task) => tasks.push(task),
            None => tracing::warn!(
                "No parsed unit for change {} ({}); skipping summary",
                change.unit_id(),
                change.item_type
            ),
        }
    }

    tasks
}

fn task_for(file: &ParsedFile, change: &ChangeRecord) -> Option<SummaryTask> {
    let (source, class_docstring) = match change.item_type {
        UnitKind::Function => (file.function(&change.item_name)?.source.clone(), None),
        UnitKind::Class => (file.class(&change.item_name)?.source.clone(), None),
        UnitKind::Method => {
            let class = file.class(change.class_name.as_deref()?)?;
            let method = class.method(&change.item_name)?;
            (method.source.clone(), class.docstring.clone())
        }
    };

    Some(SummaryTask {
        kind: change.item_type,
        file_path: change.file_path.clone(),
        class_name: change.class_name.clone(),
        name: change.item_name.clone(),
        source,
        class_docstring,
    })
}

/// Spaces call starts at least `interval` apart across all callers
pub struct RateLimiter {
    interval: Option<Duration>,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    /// `0` disables pacing
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let interval = (requests_per_minute > 0)
            .then(|| Duration::from_secs(60) / requests_per_minute);
        Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Wait for the next free slot
    pub async fn acquire(&self) {
        let Some(interval) = self.interval else {
            return;
        };

        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + interval;
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}

/// Results of one summarization pass
#[derive(Debug, Default)]
pub struct SummaryBatch {
    /// One record per task, sorted by id; failed units carry [`SUMMARY_UNAVAILABLE`]
    pub records: Vec<SummaryRecord>,
    /// `(unit id, reason)` for each failed call
    pub failures: Vec<(String, String)>,
}

impl SummaryBatch {
    pub fn generated(&self) -> usize {
        self.records.len() - self.failures.len()
    }
}

pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    limiter: RateLimiter,
    max_concurrent: usize,
    timeout: Duration,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &SummarizerConfig, llm: &LlmConfig) -> Self {
        Self {
            generator,
            limiter: RateLimiter::per_minute(config.requests_per_minute),
            max_concurrent: config.max_concurrent.max(1),
            timeout: Duration::from_secs(llm.timeout_secs),
        }
    }

    /// Summarize one unit, returning the sentinel on any failure
    pub async fn summarize(&self, task: &SummaryTask) -> (String, Option<String>) {
        match self.try_summarize(task).await {
            Ok(summary) => (summary, None),
            Err(e) => {
                tracing::warn!("Summary failed for {}: {}", task.unit_id(), e);
                (SUMMARY_UNAVAILABLE.to_string(), Some(e.to_string()))
            }
        }
    }

    async fn try_summarize(&self, task: &SummaryTask) -> Result<String, CollaboratorError> {
        self.limiter.acquire().await;

        let prompt = prompts::summary_prompt(task);
        tokio::time::timeout(self.timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| CollaboratorError::Timeout(self.timeout.as_secs()))?
    }

    /// Summarize all tasks with at most `max_concurrent` calls in flight
    pub async fn summarize_all(&self, tasks: Vec<SummaryTask>) -> SummaryBatch {
        if tasks.is_empty() {
            return SummaryBatch::default();
        }

        tracing::info!(
            "Summarizing {} units with {} (concurrency {})",
            tasks.len(),
            self.generator.model_name(),
            self.max_concurrent
        );

        let results: Vec<(SummaryTask, String, Option<String>)> = stream::iter(tasks)
            .map(|task| async move {
                let (summary, failure) = self.summarize(&task).await;
                (task, summary, failure)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut batch = SummaryBatch::default();
        for (task, summary, failure) in results {
            let record = SummaryRecord {
                file_path: task.file_path,
                kind: task.kind,
                class_name: task.class_name,
                name: task.name,
                summary,
                generated_at: Utc::now(),
            };
            if let Some(reason) = failure {
                batch.failures.push((record.id(), reason));
            }
            batch.records.push(record);
        }

        batch.records.sort_by_key(|r| r.id());
        batch.failures.sort();

        tracing::info!(
            "Generated {} summaries ({} failed)",
            batch.generated(),
            batch.failures.len()
        );
        batch
    }
}

#[cfg(test)]
mod tests;
