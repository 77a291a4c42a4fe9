use super::*;
use crate::client::test_support::test_client;
use tempfile::TempDir;

async fn create_test_server() -> (InsightMcpServer, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let client = test_client(&temp_dir.path().join("data")).await;
    let server = InsightMcpServer::with_client(Arc::new(client)).unwrap();
    (server, temp_dir)
}

fn write_project(temp_dir: &TempDir) -> String {
    let source_dir = temp_dir.path().join("src");
    std::fs::create_dir_all(&source_dir).unwrap();
    std::fs::write(
        source_dir.join("app.py"),
        "class Widget:\n    \"\"\"Draws things.\"\"\"\n\n    def render(self):\n        return 1\n\n\ndef main():\n    Widget().render()\n",
    )
    .unwrap();
    source_dir.to_string_lossy().to_string()
}

#[tokio::test]
async fn test_get_info() {
    let (server, _temp_dir) = create_test_server().await;

    let info = server.get_info();

    assert_eq!(info.server_info.name, "code-insight");
    assert!(info.server_info.title.is_some());
    assert!(info.instructions.is_some());
    assert!(info.capabilities.tools.is_some());
    assert!(info.capabilities.prompts.is_some());
}

#[tokio::test]
async fn test_server_cloneable() {
    let (server, _temp_dir) = create_test_server().await;
    let cloned = server.clone();
    assert_eq!(
        cloned.client().embedding_dimension(),
        server.client().embedding_dimension()
    );
}

// ===== Tool Handler Tests =====

#[tokio::test]
async fn test_tool_ingest_then_status() {
    let (server, temp_dir) = create_test_server().await;
    let path = write_project(&temp_dir);

    let output = server
        .ingest_project(Parameters(IngestRequest {
            path,
            project: "app".to_string(),
        }))
        .await
        .unwrap();
    let response: IngestResponse = serde_json::from_str(&output).unwrap();
    assert_eq!(response.changes_detected, 2);
    assert_eq!(response.documents_indexed, 2);

    let output = server
        .project_status(Parameters(ProjectRequest {
            project: "app".to_string(),
        }))
        .await
        .unwrap();
    let status: StatusResponse = serde_json::from_str(&output).unwrap();
    assert_eq!(status.tracked_files, 1);
    assert_eq!(status.functions, 1);
    assert_eq!(status.classes, 1);
    assert_eq!(status.indexed_documents, 2);
}

#[tokio::test]
async fn test_tool_ingest_missing_directory() {
    let (server, _temp_dir) = create_test_server().await;

    let err = server
        .ingest_project(Parameters(IngestRequest {
            path: "/nonexistent/path/12345".to_string(),
            project: "app".to_string(),
        }))
        .await
        .unwrap_err();
    assert!(err.contains("Directory not found"));
}

#[tokio::test]
async fn test_tool_ask_project() {
    let (server, temp_dir) = create_test_server().await;
    let path = write_project(&temp_dir);
    server
        .ingest_project(Parameters(IngestRequest {
            path,
            project: "app".to_string(),
        }))
        .await
        .unwrap();

    let output = server
        .ask_project(Parameters(AskRequest {
            project: "app".to_string(),
            question: "What does Widget do?".to_string(),
            top_k: Some(2),
        }))
        .await
        .unwrap();
    let response: AskResponse = serde_json::from_str(&output).unwrap();
    assert_eq!(response.answer, "It renders widgets.");
    assert!(!response.sources.is_empty());
}

#[tokio::test]
async fn test_tool_ask_validation_failure() {
    let (server, _temp_dir) = create_test_server().await;

    let err = server
        .ask_project(Parameters(AskRequest {
            project: "app".to_string(),
            question: "   ".to_string(),
            top_k: None,
        }))
        .await
        .unwrap_err();
    assert!(err.contains("question must not be empty"));
}

#[tokio::test]
async fn test_tool_search_unknown_project() {
    let (server, _temp_dir) = create_test_server().await;

    let err = server
        .search_summaries(Parameters(SearchRequest {
            project: "nothing-here".to_string(),
            query: "widget".to_string(),
            limit: None,
            min_score: None,
        }))
        .await
        .unwrap_err();
    assert!(err.contains("nothing-here"));
}

#[tokio::test]
async fn test_tool_rebuild_and_clear() {
    let (server, temp_dir) = create_test_server().await;
    let path = write_project(&temp_dir);
    server
        .ingest_project(Parameters(IngestRequest {
            path,
            project: "app".to_string(),
        }))
        .await
        .unwrap();

    let output = server
        .rebuild_index(Parameters(ProjectRequest {
            project: "app".to_string(),
        }))
        .await
        .unwrap();
    let rebuilt: RebuildResponse = serde_json::from_str(&output).unwrap();
    assert_eq!(rebuilt.documents_indexed, 2);

    let output = server
        .clear_project(Parameters(ProjectRequest {
            project: "app".to_string(),
        }))
        .await
        .unwrap();
    let cleared: ClearResponse = serde_json::from_str(&output).unwrap();
    assert!(cleared.success);

    let err = server
        .project_status(Parameters(ProjectRequest {
            project: "app".to_string(),
        }))
        .await
        .unwrap_err();
    assert!(err.contains("no ingested state"));
}

// ===== Prompt Handler Tests =====

#[tokio::test]
async fn test_prompt_ingest_with_path() {
    let (server, _temp_dir) = create_test_server().await;

    let args = serde_json::json!({
        "path": "/test/path",
        "project": "demo"
    });

    let prompt_result = server.ingest_prompt(Parameters(args)).await.unwrap();
    assert!(prompt_result.description.is_some());
    assert!(!prompt_result.messages.is_empty());
    let debug_str = format!("{:?}", prompt_result.messages[0].content);
    assert!(debug_str.contains("/test/path"));
    assert!(debug_str.contains("demo"));
}

#[tokio::test]
async fn test_prompt_ingest_defaults() {
    let (server, _temp_dir) = create_test_server().await;

    let prompt_result = server
        .ingest_prompt(Parameters(serde_json::json!({})))
        .await
        .unwrap();
    let debug_str = format!("{:?}", prompt_result.messages[0].content);
    assert!(debug_str.contains("'.'"));
    assert!(debug_str.contains("'default'"));
}

#[tokio::test]
async fn test_prompt_ask_with_question() {
    let (server, _temp_dir) = create_test_server().await;

    let args = serde_json::json!({
        "project": "demo",
        "question": "Where is rendering done?"
    });

    let messages = server.ask_prompt(Parameters(args)).await.unwrap();
    assert_eq!(messages.len(), 1);
    let debug_str = format!("{:?}", messages[0].content);
    assert!(debug_str.contains("Where is rendering done?"));
}
