//! The incremental ingestion pipeline
//!
//! scan -> parse -> fingerprint -> detect -> summarize -> reconcile -> index -> persist

use super::InsightClient;
use crate::changes::{DetectOptions, detect_changes, sort_changes};
use crate::error::InsightError;
use crate::indexer::{FileParse, FileWalker, ParsedFile, fingerprint, parse_files};
use crate::reconcile::{IndexUpdate, ReconcilePlan};
use crate::snapshot::Snapshot;
use crate::summarizer::plan_tasks;
use crate::summary_store::SummaryStore;
use crate::types::{ChangeKind, ChangeRecord, IngestRequest, IngestResponse, UnitKind};
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Instant;

/// Outcome of scanning and parsing the project directory
struct ScanOutcome {
    snapshot: Snapshot,
    parsed: BTreeMap<String, ParsedFile>,
    /// Files present on disk that failed to parse this run
    unparsed: BTreeSet<String>,
    files_scanned: usize,
    files_skipped: usize,
    errors: Vec<String>,
}

pub(crate) async fn ingest_project(
    client: &InsightClient,
    request: IngestRequest,
) -> Result<IngestResponse, InsightError> {
    let start = Instant::now();
    let project = request.project;
    let root = InsightClient::normalize_path(&request.path)?;

    let _lock = client.locks.acquire(&project).await?;
    tracing::info!("Ingesting {:?} as project '{}'", root, project);

    let snapshot_path = client.snapshot_path(&project);
    let store_path = client.summary_store_path(&project);
    let (old_snapshot, mut store) = load_prior_state(&snapshot_path, &store_path);
    let full_run = old_snapshot.is_empty();

    // Scan + parse
    let walker = FileWalker::from_config(&root, &client.config.scanner);
    let files = tokio::task::spawn_blocking(move || walker.walk())
        .await
        .context("Failed to spawn file walker task")??;
    let files_scanned = files.len();
    tracing::info!("Found {} source files", files_scanned);

    let parses = tokio::task::spawn_blocking(move || parse_files(files))
        .await
        .context("Failed to spawn parser task")?;
    let scan = fingerprint_files(parses, &old_snapshot);

    // Detect
    let options = DetectOptions {
        enumerate_class_methods: client.config.detection.enumerate_class_methods,
    };
    let mut changes = detect_changes(&old_snapshot, &scan.snapshot, options);
    if full_run {
        let orphans = orphaned_units(&store, &scan.parsed, &scan.unparsed);
        if !orphans.is_empty() {
            tracing::info!("Pruning {} stored units with no current source", orphans.len());
            changes.extend(orphans);
            sort_changes(&mut changes);
        }
    }
    tracing::info!("Detected {} changes", changes.len());
    for change in &changes {
        tracing::debug!("{} {} {}", change.change_type, change.item_type, change.unit_id());
    }

    // Summarize
    let tasks = plan_tasks(&changes, &scan.parsed);
    let batch = client.summarizer.summarize_all(tasks).await;
    let summaries_generated = batch.generated();
    let summaries_failed = batch.failures.len();
    let summarized = batch.records.len();
    let mut errors = scan.errors;
    errors.extend(
        batch
            .failures
            .iter()
            .map(|(id, reason)| format!("Summary failed for {}: {}", id, reason)),
    );

    // Reconcile
    let plan = ReconcilePlan::build(&changes, batch.records, &store);
    let update = plan.index_update();
    let removed = plan.apply_to_store(&mut store);
    tracing::info!(
        "Reconciled summary store: {} upserted, {} removed",
        plan.upserts.len(),
        removed
    );

    // Index
    let (documents_deleted, documents_indexed) =
        apply_index_update(client, &project, update, summarized).await?;

    // Persist; the snapshot goes last
    store
        .save(&store_path)
        .map_err(|e| InsightError::pipeline("summary store save", summarized, e))?;
    scan.snapshot
        .save(&snapshot_path)
        .map_err(|e| InsightError::pipeline("snapshot save", summarized, e))?;

    let duration_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Ingested project '{}' in {}ms: {} changes, {} summaries ({} failed), {} files skipped",
        project,
        duration_ms,
        changes.len(),
        summaries_generated,
        summaries_failed,
        scan.files_skipped
    );

    Ok(IngestResponse {
        project,
        changes_detected: changes.len(),
        changes,
        summaries_generated,
        summaries_failed,
        documents_deleted,
        documents_indexed,
        files_scanned: scan.files_scanned,
        files_skipped: scan.files_skipped,
        duration_ms,
        errors,
    })
}

/// Load the snapshot and the summary store as one unit of prior state
///
/// A corrupt snapshot is empty prior state. A corrupt or missing store next to a
/// non-empty snapshot also resets the snapshot, so every current unit is summarized
/// again instead of being treated as unchanged.
fn load_prior_state(snapshot_path: &Path, store_path: &Path) -> (Snapshot, SummaryStore) {
    let snapshot = Snapshot::load_or_empty(snapshot_path);

    match SummaryStore::load(store_path) {
        Ok(store) if snapshot.is_empty() || store_path.exists() => (snapshot, store),
        Ok(store) => {
            tracing::warn!("Summary store {:?} is missing; re-ingesting every unit", store_path);
            (Snapshot::default(), store)
        }
        Err(e) => {
            tracing::warn!("{}; re-ingesting every unit", e);
            (Snapshot::default(), SummaryStore::default())
        }
    }
}

/// Removal records for stored units that no longer exist in the parsed project
///
/// Only used when there is no prior snapshot to diff against. Units of files that
/// failed to parse are kept.
fn orphaned_units(
    store: &SummaryStore,
    parsed: &BTreeMap<String, ParsedFile>,
    unparsed: &BTreeSet<String>,
) -> Vec<ChangeRecord> {
    let live: BTreeSet<(UnitKind, String)> = parsed
        .values()
        .flat_map(ParsedFile::unit_ids)
        .map(|(kind, id)| (kind, id.to_string()))
        .collect();

    store
        .records()
        .filter(|record| !unparsed.contains(&record.file_path))
        .filter(|record| !live.contains(&(record.kind, record.id())))
        .map(|record| ChangeRecord {
            file_path: record.file_path.clone(),
            item_type: record.kind,
            item_name: record.name.clone(),
            class_name: record.class_name.clone(),
            change_type: ChangeKind::Removed,
        })
        .collect()
}

/// Build the new snapshot from parse results
///
/// A file that fails to parse keeps its previous fingerprint, so its units are
/// neither reported as removed nor re-summarized until it parses again.
fn fingerprint_files(parses: Vec<FileParse>, old_snapshot: &Snapshot) -> ScanOutcome {
    let mut outcome = ScanOutcome {
        snapshot: Snapshot::default(),
        parsed: BTreeMap::new(),
        unparsed: BTreeSet::new(),
        files_scanned: parses.len(),
        files_skipped: 0,
        errors: Vec::new(),
    };

    for FileParse { file, result } in parses {
        match result {
            Ok(parsed) => {
                tracing::debug!("Parsed {} ({} units)", file.relative_path, parsed.unit_count());
                outcome
                    .snapshot
                    .insert(file.relative_path.clone(), fingerprint(&parsed));
                outcome.parsed.insert(file.relative_path, parsed);
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", file.relative_path, e);
                outcome.errors.push(e.to_string());
                outcome.files_skipped += 1;
                outcome.unparsed.insert(file.relative_path.clone());
                if let Some(previous) = old_snapshot.get(&file.relative_path) {
                    outcome
                        .snapshot
                        .insert(file.relative_path, previous.clone());
                }
            }
        }
    }

    outcome
}

/// Delete stale documents, then insert the new ones. Any failure aborts the run.
async fn apply_index_update(
    client: &InsightClient,
    project: &str,
    update: IndexUpdate,
    processed: usize,
) -> Result<(usize, usize), InsightError> {
    if update.is_empty() {
        return Ok((0, 0));
    }

    let deleted = client
        .vector_db
        .delete_documents(project, &update.delete_ids)
        .await
        .map_err(|e| InsightError::pipeline("index delete", processed, e))?;

    let indexed = client
        .index_documents(project, update.documents)
        .await
        .map_err(|e| InsightError::pipeline("index insert", processed, e))?;

    tracing::info!("Index updated: {} deleted, {} inserted", deleted, indexed);
    Ok((deleted, indexed))
}
