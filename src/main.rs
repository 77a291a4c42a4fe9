//! # Code Insight CLI (`code-insight`)
//!
//! ```bash
//! code-insight ingest ./my-service --project my-service
//! code-insight ask my-service "Where are retries configured?"
//! code-insight serve            # MCP server over stdio
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use code_insight::mcp_server::InsightMcpServer;
use code_insight::{
    AskRequest, Config, IngestRequest, InsightClient, ProjectRequest, SearchRequest,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "code-insight",
    about = "Incremental code summaries and question answering for Python projects",
    version
)]
struct Cli {
    /// Path to a TOML configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "CODE_INSIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Print responses as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server over stdio
    Serve,

    /// Detect changes in a project directory and update its summaries and index
    Ingest {
        /// Project directory
        path: String,

        /// Project id (defaults to the directory name)
        #[arg(long)]
        project: Option<String>,
    },

    /// Answer a question about an ingested project
    Ask {
        project: String,
        question: String,

        /// Number of summaries used as context
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// List the summaries closest to a query
    Search {
        project: String,
        query: String,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        min_score: Option<f32>,
    },

    /// Show what is stored for a project
    Status { project: String },

    /// Re-index a project's stored summaries
    Rebuild { project: String },

    /// Delete everything stored for a project
    Clear { project: String },

    /// Print build information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!(
            "code-insight {} (built {}, commit {})",
            env!("CARGO_PKG_VERSION"),
            env!("BUILD_TIMESTAMP"),
            env!("GIT_COMMIT_HASH")
        );
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::from_file_with_env(path)?,
        None => Config::new()?,
    };
    let client = InsightClient::with_config(config).await?;

    match cli.command {
        Commands::Serve => {
            let server = InsightMcpServer::with_client(Arc::new(client))?;
            server.serve_stdio().await?;
        }
        Commands::Ingest { path, project } => {
            let project = match project {
                Some(project) => project,
                None => default_project_id(&path)?,
            };
            let response = client.ingest(IngestRequest { path, project }).await?;
            if cli.json {
                print_json(&response)?;
            } else {
                for change in &response.changes {
                    println!(
                        "{:<9} {:<8} {}",
                        change.change_type.to_string(),
                        change.item_type.to_string(),
                        change.unit_id()
                    );
                }
                println!(
                    "{} changes, {} summaries ({} failed), {} documents indexed, {} files skipped in {}ms",
                    response.changes_detected,
                    response.summaries_generated,
                    response.summaries_failed,
                    response.documents_indexed,
                    response.files_skipped,
                    response.duration_ms
                );
                for error in &response.errors {
                    eprintln!("warning: {}", error);
                }
            }
        }
        Commands::Ask {
            project,
            question,
            top_k,
        } => {
            let response = client
                .ask(AskRequest {
                    project,
                    question,
                    top_k,
                })
                .await?;
            if cli.json {
                print_json(&response)?;
            } else {
                println!("{}", response.answer);
                if !response.sources.is_empty() {
                    println!("\nSources:");
                    for hit in &response.sources {
                        println!("  {} ({:.3})", hit.id, hit.score);
                    }
                }
            }
        }
        Commands::Search {
            project,
            query,
            limit,
            min_score,
        } => {
            let response = client
                .search(SearchRequest {
                    project,
                    query,
                    limit,
                    min_score,
                })
                .await?;
            if cli.json {
                print_json(&response)?;
            } else {
                for hit in &response.results {
                    println!("{:.3}  {}\n       {}", hit.score, hit.id, hit.text);
                }
            }
        }
        Commands::Status { project } => {
            let response = client.status(ProjectRequest { project }).await?;
            if cli.json {
                print_json(&response)?;
            } else {
                println!("Project:   {}", response.project);
                println!("Files:     {}", response.tracked_files);
                println!("Functions: {}", response.functions);
                println!("Classes:   {}", response.classes);
                println!("Methods:   {}", response.methods);
                println!("Indexed:   {}", response.indexed_documents);
                if response.corrupt_state {
                    println!("State:     corrupt (next ingest re-summarizes every unit)");
                }
            }
        }
        Commands::Rebuild { project } => {
            let response = client.rebuild_index(ProjectRequest { project }).await?;
            if cli.json {
                print_json(&response)?;
            } else {
                println!(
                    "Indexed {} summaries for '{}' in {}ms",
                    response.documents_indexed, response.project, response.duration_ms
                );
            }
        }
        Commands::Clear { project } => {
            let response = client.clear(ProjectRequest { project }).await?;
            if cli.json {
                print_json(&response)?;
            } else {
                println!("{}", response.message);
            }
        }
        Commands::Version => {}
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Directory name of the ingested path, reduced to the project id alphabet
fn default_project_id(path: &str) -> Result<String> {
    let canonical = InsightClient::normalize_path(path)?;
    let name = canonical
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "default".to_string());
    let id: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '-'
            }
        })
        .take(64)
        .collect();
    Ok(id)
}
