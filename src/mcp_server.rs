use crate::client::InsightClient;
use crate::types::*;

use anyhow::{Context, Result};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
    handler::server::{router::prompt::PromptRouter, tool::ToolRouter, wrapper::Parameters},
    model::*,
    prompt, prompt_handler, prompt_router,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct InsightMcpServer {
    client: Arc<InsightClient>,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

impl InsightMcpServer {
    /// Create a new server with default configuration
    pub async fn new() -> Result<Self> {
        let client = InsightClient::new().await?;
        Self::with_client(Arc::new(client))
    }

    /// Create a new server with an existing client
    pub fn with_client(client: Arc<InsightClient>) -> Result<Self> {
        Ok(Self {
            client,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        })
    }

    /// Get the underlying client
    pub fn client(&self) -> &InsightClient {
        &self.client
    }
}

fn to_json<T: Serialize>(response: &T) -> Result<String, String> {
    serde_json::to_string_pretty(response).map_err(|e| format!("Serialization failed: {}", e))
}

#[tool_router(router = tool_router)]
impl InsightMcpServer {
    #[tool(
        description = "Ingest a Python project directory: detect which functions, classes and methods changed since the last run, summarize them with the language model and update the search index. Safe to re-run; unchanged code is never re-summarized."
    )]
    async fn ingest_project(
        &self,
        Parameters(req): Parameters<IngestRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let response = self
            .client
            .ingest(req)
            .await
            .map_err(|e| e.to_user_string())?;

        to_json(&response)
    }

    #[tool(description = "Answer a natural-language question about an ingested project")]
    async fn ask_project(
        &self,
        Parameters(req): Parameters<AskRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let response = self
            .client
            .ask(req)
            .await
            .map_err(|e| e.to_user_string())?;

        to_json(&response)
    }

    #[tool(description = "Find the code summaries most similar to a query, without generating an answer")]
    async fn search_summaries(
        &self,
        Parameters(req): Parameters<SearchRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let response = self
            .client
            .search(req)
            .await
            .map_err(|e| e.to_user_string())?;

        to_json(&response)
    }

    #[tool(description = "Show tracked files, stored summaries and indexed documents of a project")]
    async fn project_status(
        &self,
        Parameters(req): Parameters<ProjectRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let response = self
            .client
            .status(req)
            .await
            .map_err(|e| e.to_user_string())?;

        to_json(&response)
    }

    #[tool(description = "Rebuild a project's search index from its stored summaries")]
    async fn rebuild_index(
        &self,
        Parameters(req): Parameters<ProjectRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let response = self
            .client
            .rebuild_index(req)
            .await
            .map_err(|e| e.to_user_string())?;

        to_json(&response)
    }

    #[tool(description = "Delete all stored state of a project (snapshot, summaries and index documents)")]
    async fn clear_project(
        &self,
        Parameters(req): Parameters<ProjectRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let response = self
            .client
            .clear(req)
            .await
            .map_err(|e| e.to_user_string())?;

        to_json(&response)
    }
}

// Prompts for slash commands
#[prompt_router]
impl InsightMcpServer {
    #[prompt(
        name = "ingest",
        description = "Ingest (or refresh) a Python project so questions can be asked about it"
    )]
    async fn ingest_prompt(
        &self,
        Parameters(args): Parameters<serde_json::Value>,
    ) -> Result<GetPromptResult, McpError> {
        let path = args.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let project = args
            .get("project")
            .and_then(|v| v.as_str())
            .unwrap_or("default");

        let messages = vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Please ingest the project at path '{}' as project '{}'. Only code that changed since the last ingestion will be summarized again.",
                path, project
            ),
        )];

        Ok(GetPromptResult {
            description: Some(format!("Ingest {} as project {}", path, project)),
            messages,
        })
    }

    #[prompt(
        name = "ask",
        description = "Ask a question about an ingested project"
    )]
    async fn ask_prompt(
        &self,
        Parameters(args): Parameters<serde_json::Value>,
    ) -> Result<Vec<PromptMessage>, McpError> {
        let question = args.get("question").and_then(|v| v.as_str()).unwrap_or("");
        let project = args
            .get("project")
            .and_then(|v| v.as_str())
            .unwrap_or("default");

        Ok(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Please answer this question about project '{}': {}",
                project, question
            ),
        )])
    }
}

#[tool_handler(router = self.tool_router)]
#[prompt_handler]
impl ServerHandler for InsightMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: "code-insight".into(),
                title: Some("Code Insight - Incremental Code Summaries and Q&A".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Summarizes Python code per function, class and method and answers questions from the summaries. \
                Use ingest_project first (re-run it after code changes), then ask_project or search_summaries."
                    .into(),
            ),
        }
    }
}

impl InsightMcpServer {
    pub async fn serve_stdio(self) -> Result<()> {
        tracing::info!("Starting code-insight MCP server");

        let transport = rmcp::transport::io::stdio();

        self.serve(transport)
            .await
            .context("Failed to start MCP server")?
            .waiting()
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests;
