//! Retrieval, answering and project maintenance

use super::InsightClient;
use crate::error::{CollaboratorError, InsightError};
use crate::snapshot::Snapshot;
use crate::state_file;
use crate::summarizer::prompts::{answer_prompt, format_context};
use crate::summary_store::SummaryStore;
use crate::types::*;
use std::time::Instant;

pub(crate) async fn ask(
    client: &InsightClient,
    request: AskRequest,
) -> Result<AskResponse, InsightError> {
    let start = Instant::now();
    client.require_project(&request.project)?;

    let top_k = request.top_k.unwrap_or(client.config.search.top_k);
    let sources = client
        .retrieve(
            &request.project,
            &request.question,
            top_k,
            client.config.search.min_score,
        )
        .await?;
    tracing::info!(
        "Retrieved {} summaries for question in project '{}'",
        sources.len(),
        request.project
    );

    let context = format_context(&sources);
    let prompt = answer_prompt(&request.question, &context);
    let answer = client.generate(&prompt).await?;

    Ok(AskResponse {
        answer,
        sources,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

pub(crate) async fn search(
    client: &InsightClient,
    request: SearchRequest,
) -> Result<SearchResponse, InsightError> {
    let start = Instant::now();
    client.require_project(&request.project)?;

    let limit = request.limit.unwrap_or(client.config.search.top_k);
    let min_score = request.min_score.unwrap_or(client.config.search.min_score);
    let results = client
        .retrieve(&request.project, &request.query, limit, min_score)
        .await?;

    Ok(SearchResponse {
        results,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

pub(crate) async fn status(
    client: &InsightClient,
    request: ProjectRequest,
) -> Result<StatusResponse, InsightError> {
    let project = request.project;
    client.require_project(&project)?;

    let snapshot = Snapshot::load(&client.snapshot_path(&project));
    let store = SummaryStore::load(&client.summary_store_path(&project));
    let corrupt_state = snapshot.is_err() || store.is_err();
    if let Err(e) = &snapshot {
        tracing::warn!("{}", e);
    }
    if let Err(e) = &store {
        tracing::warn!("{}", e);
    }
    let snapshot = snapshot.unwrap_or_default();
    let store = store.unwrap_or_default();
    let indexed_documents = client
        .vector_db
        .count_documents(&project)
        .await
        .map_err(|e| CollaboratorError::Index(format!("{:#}", e)))?;

    Ok(StatusResponse {
        tracked_files: snapshot.len(),
        functions: store.functions.len(),
        classes: store.classes.len(),
        methods: store.methods.len(),
        indexed_documents,
        corrupt_state,
        project,
    })
}

pub(crate) async fn rebuild_index(
    client: &InsightClient,
    request: ProjectRequest,
) -> Result<RebuildResponse, InsightError> {
    let start = Instant::now();
    let project = request.project;
    client.require_project(&project)?;

    let _lock = client.locks.acquire(&project).await?;
    let store = SummaryStore::load(&client.summary_store_path(&project))?;

    let cleared = client
        .vector_db
        .clear_project(&project)
        .await
        .map_err(|e| InsightError::pipeline("index clear", 0, e))?;
    tracing::info!(
        "Rebuilding index for project '{}': {} stale documents removed, {} summaries to index",
        project,
        cleared,
        store.len()
    );

    let documents_indexed = client
        .index_documents(&project, store.documents())
        .await
        .map_err(|e| InsightError::pipeline("index insert", 0, e))?;

    Ok(RebuildResponse {
        project,
        documents_indexed,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

pub(crate) async fn clear(
    client: &InsightClient,
    request: ProjectRequest,
) -> Result<ClearResponse, InsightError> {
    let project = request.project;
    let _lock = client.locks.acquire(&project).await?;

    let documents = client
        .vector_db
        .clear_project(&project)
        .await
        .map_err(|e| CollaboratorError::Index(format!("{:#}", e)))?;

    let snapshot_removed = state_file::remove_state(&client.snapshot_path(&project))?;
    let store_removed = state_file::remove_state(&client.summary_store_path(&project))?;

    let state_dir = crate::paths::PlatformPaths::project_state_dir(client.data_dir(), &project);
    // Only an empty directory is removed; stray files are left for the user
    if state_dir.exists()
        && let Err(e) = std::fs::remove_dir(&state_dir)
    {
        tracing::warn!("Could not remove project directory {:?}: {}", state_dir, e);
    }

    let message = if documents == 0 && !snapshot_removed && !store_removed {
        format!("Project '{}' had no stored state", project)
    } else {
        format!(
            "Cleared project '{}': {} index documents, snapshot {}, summary store {}",
            project,
            documents,
            if snapshot_removed { "deleted" } else { "absent" },
            if store_removed { "deleted" } else { "absent" },
        )
    };
    tracing::info!("{}", message);

    Ok(ClearResponse {
        project,
        success: true,
        message,
    })
}
