/// Centralized error types for code-insight using thiserror
///
/// The four pipeline categories map to how a run reacts:
/// - `NotFound`: fatal for the run, never retried
/// - `Parse`: per file, the file is skipped and the run continues
/// - `Collaborator`: per unit inside the summarizer (sentinel), fatal during index reconciliation
/// - `CorruptState`: prior state is treated as empty and a warning is logged
use thiserror::Error;

/// Main error type for code-insight
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Corrupt state: {0}")]
    CorruptState(#[from] CorruptStateError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A run failed part-way; `processed` counts what completed before `stage` failed
    #[error("Ingestion failed during {stage} after {processed} items: {reason}")]
    Pipeline {
        stage: String,
        processed: usize,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Missing inputs or project state
#[derive(Error, Debug)]
pub enum NotFoundError {
    #[error("Directory not found: {0}")]
    Directory(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Project has no ingested state: {0}")]
    Project(String),
}

/// Errors produced while turning one source file into units
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Failed to read file '{file}': {reason}")]
    Read { file: String, reason: String },

    #[error("Syntax error in '{file}' at line {line}")]
    Syntax { file: String, line: usize },

    #[error("Unsupported language for file: {0}")]
    UnsupportedLanguage(String),

    #[error("Failed to load grammar: {0}")]
    Grammar(String),
}

/// Failures of the external collaborators (LLM, embedding model, search index)
#[derive(Error, Debug, Clone)]
pub enum CollaboratorError {
    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("LLM returned an empty response")]
    EmptyResponse,

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Search index operation failed: {0}")]
    Index(String),

    #[error("Collaborator call timed out after {0} seconds")]
    Timeout(u64),

    #[error("LLM provider is disabled")]
    Disabled,
}

/// Persisted state that could not be read back
#[derive(Error, Debug)]
pub enum CorruptStateError {
    #[error("Failed to read state file '{path}': {reason}")]
    Unreadable { path: String, reason: String },

    #[error("State file '{path}' is malformed: {reason}")]
    Malformed { path: String, reason: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to input validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid project id: {0}")]
    InvalidProjectId(String),

    #[error("{field} must be {constraint}, got {actual}")]
    ConstraintViolation {
        field: String,
        constraint: String,
        actual: String,
    },

    #[error("Empty {0}")]
    Empty(String),

    #[error("Invalid request: {0}")]
    Request(String),
}

impl From<anyhow::Error> for InsightError {
    fn from(err: anyhow::Error) -> Self {
        InsightError::Other(format!("{:#}", err))
    }
}

impl InsightError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        InsightError::Other(msg.into())
    }

    /// Wrap a stage failure together with the number of items already processed
    pub fn pipeline(stage: impl Into<String>, processed: usize, reason: impl std::fmt::Display) -> Self {
        InsightError::Pipeline {
            stage: stage.into(),
            processed,
            reason: format!("{:#}", reason),
        }
    }

    /// Convert to a user-facing error string suitable for MCP responses
    pub fn to_user_string(&self) -> String {
        format!("{}", self)
    }

    /// Check if this is a user error (bad input, missing directory) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            InsightError::Validation(_)
                | InsightError::NotFound(_)
                | InsightError::Config(ConfigError::InvalidValue { .. })
        )
    }

    /// Check if this error is retryable
    ///
    /// A failed run never writes the snapshot, so retrying re-detects the same changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InsightError::Collaborator(CollaboratorError::Timeout(_))
                | InsightError::Collaborator(CollaboratorError::Llm(_))
                | InsightError::Collaborator(CollaboratorError::Index(_))
                | InsightError::Pipeline { .. }
                | InsightError::Io(_)
        )
    }
}
