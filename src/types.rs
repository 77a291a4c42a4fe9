use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delimiter between the parts of a qualified unit identity
pub const ID_DELIMITER: &str = "::";

/// Kind of structural unit
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Function,
    Class,
    Method,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Function => "function",
            UnitKind::Class => "class",
            UnitKind::Method => "method",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "function" => Some(UnitKind::Function),
            "class" => Some(UnitKind::Class),
            "method" => Some(UnitKind::Method),
            _ => None,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualified identity of a unit: (file, name) or (file, class, method)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId {
    pub file_path: String,
    pub class_name: Option<String>,
    pub name: String,
}

impl UnitId {
    pub fn new(file_path: &str, class_name: Option<&str>, name: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
            class_name: class_name.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Prefix shared by every method id of a class
    pub fn class_member_prefix(file_path: &str, class_name: &str) -> String {
        format!("{file_path}{ID_DELIMITER}{class_name}{ID_DELIMITER}")
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class_name {
            Some(class) => write!(
                f,
                "{}{ID_DELIMITER}{}{ID_DELIMITER}{}",
                self.file_path, class, self.name
            ),
            None => write!(f, "{}{ID_DELIMITER}{}", self.file_path, self.name),
        }
    }
}

/// How a unit changed between two snapshots
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
        })
    }
}

/// One detected change to one unit
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct ChangeRecord {
    /// File path relative to the project root
    pub file_path: String,
    /// Kind of unit that changed
    pub item_type: UnitKind,
    /// Name of the function, class or method
    pub item_name: String,
    /// Owning class, present for methods only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// added, modified or removed
    pub change_type: ChangeKind,
}

impl ChangeRecord {
    pub fn unit_id(&self) -> UnitId {
        UnitId::new(&self.file_path, self.class_name.as_deref(), &self.item_name)
    }
}

/// Metadata stored next to every indexed summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentMetadata {
    /// File path relative to the project root
    pub source: String,
    /// function, class or method
    #[serde(rename = "type")]
    pub unit_type: UnitKind,
    pub name: String,
    /// Owning class, methods only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

/// A summary projected into the search index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Qualified unit identity, e.g. `a.py::Widget::render`
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// A single retrieval result
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchHit {
    pub id: String,
    /// The summary text
    pub text: String,
    pub metadata: DocumentMetadata,
    /// Similarity score (higher is better)
    pub score: f32,
}

/// Request to ingest (or re-ingest) a project directory
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IngestRequest {
    /// Path to the project directory
    pub path: String,
    /// Project id that keys the stored snapshot, summaries and index documents
    pub project: String,
}

/// Result of an ingestion run
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IngestResponse {
    pub project: String,
    /// Number of detected unit changes
    pub changes_detected: usize,
    /// The detected changes, sorted by file, class, name
    pub changes: Vec<ChangeRecord>,
    /// Summaries generated successfully
    pub summaries_generated: usize,
    /// Units whose summary request failed (stored with a placeholder text)
    pub summaries_failed: usize,
    /// Index documents deleted before insertion
    pub documents_deleted: usize,
    /// Index documents inserted
    pub documents_indexed: usize,
    /// Source files found by the scanner
    pub files_scanned: usize,
    /// Files skipped because they could not be parsed
    pub files_skipped: usize,
    pub duration_ms: u64,
    /// Non-fatal problems (unparseable files, failed summaries)
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Ask a natural-language question about a project
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AskRequest {
    pub project: String,
    pub question: String,
    /// Number of summaries used as context (default from configuration)
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AskResponse {
    pub answer: String,
    /// Summaries the answer was grounded on
    pub sources: Vec<SearchHit>,
    pub duration_ms: u64,
}

/// Retrieve matching summaries without generating an answer
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchRequest {
    pub project: String,
    pub query: String,
    /// Number of results (default from configuration)
    #[serde(default)]
    pub limit: Option<usize>,
    /// Minimum similarity score (0.0 to 1.0)
    #[serde(default)]
    pub min_score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub duration_ms: u64,
}

/// Request scoped to a single project
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectRequest {
    pub project: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
    pub project: String,
    /// Files present in the stored snapshot
    pub tracked_files: usize,
    pub functions: usize,
    pub classes: usize,
    pub methods: usize,
    /// Live documents in the search index
    pub indexed_documents: usize,
    /// A state file could not be read and counts as empty; the next ingest
    /// summarizes every unit again
    pub corrupt_state: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RebuildResponse {
    pub project: String,
    pub documents_indexed: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClearResponse {
    pub project: String,
    pub success: bool,
    pub message: String,
}

const MAX_LIMIT: usize = 100;

/// Project ids become directory names, so they are restricted to a safe alphabet
pub fn validate_project_id(project: &str) -> Result<(), String> {
    if project.is_empty() || project.len() > 64 {
        return Err(format!(
            "Invalid project id '{}': must be 1-64 characters",
            project
        ));
    }
    if project == "." || project == ".." {
        return Err(format!("Invalid project id '{}'", project));
    }
    if !project
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(format!(
            "Invalid project id '{}': only letters, digits, '_', '-' and '.' are allowed",
            project
        ));
    }
    Ok(())
}

fn validate_limit(field: &str, value: Option<usize>) -> Result<(), String> {
    match value {
        Some(v) if v == 0 || v > MAX_LIMIT => Err(format!(
            "{} must be between 1 and {}, got {}",
            field, MAX_LIMIT, v
        )),
        _ => Ok(()),
    }
}

impl IngestRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_project_id(&self.project)?;
        if self.path.trim().is_empty() {
            return Err("path must not be empty".to_string());
        }
        Ok(())
    }
}

impl AskRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_project_id(&self.project)?;
        if self.question.trim().is_empty() {
            return Err("question must not be empty".to_string());
        }
        validate_limit("top_k", self.top_k)
    }
}

impl SearchRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_project_id(&self.project)?;
        if self.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        validate_limit("limit", self.limit)?;
        if let Some(score) = self.min_score
            && !(0.0..=1.0).contains(&score)
        {
            return Err(format!("min_score must be between 0.0 and 1.0, got {}", score));
        }
        Ok(())
    }
}

impl ProjectRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_project_id(&self.project)
    }
}
