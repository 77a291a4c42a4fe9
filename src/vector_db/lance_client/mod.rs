//! LanceDB vector database client
//!
//! All projects share one table; every row carries its project id and every
//! query filters on it.

use super::{VectorDatabase, check_lengths};
use crate::types::{DocumentMetadata, IndexedDocument, SearchHit, UnitKind};
use anyhow::{Context, Result, bail};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;

const DEFAULT_TABLE: &str = "code_summaries";

/// Ids per `IN (...)` clause
const DELETE_CHUNK: usize = 500;

/// LanceDB vector database implementation (embedded, no server required)
pub struct LanceVectorDB {
    connection: Connection,
    table_name: String,
    db_path: String,
}

impl LanceVectorDB {
    /// Create a new LanceDB instance with default path
    pub async fn new() -> Result<Self> {
        let db_path = Self::default_lancedb_path();
        Self::with_path(&db_path).await
    }

    /// Create a new LanceDB instance with custom path
    pub async fn with_path(db_path: &str) -> Result<Self> {
        Self::with_table(db_path, DEFAULT_TABLE).await
    }

    pub async fn with_table(db_path: &str, table_name: &str) -> Result<Self> {
        tracing::info!("Connecting to LanceDB at: {}", db_path);

        let connection = lancedb::connect(db_path)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        Ok(Self {
            connection,
            table_name: table_name.to_string(),
            db_path: db_path.to_string(),
        })
    }

    /// Get default database path (public for CLI version info)
    pub fn default_lancedb_path() -> String {
        crate::paths::PlatformPaths::default_lancedb_path()
            .to_string_lossy()
            .to_string()
    }

    /// Create schema for the summaries table
    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("id", DataType::Utf8, false),
            Field::new("project", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("unit_type", DataType::Utf8, false),
            Field::new("class", DataType::Utf8, true),
            Field::new("name", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("indexed_at", DataType::Utf8, false),
        ]))
    }

    async fn get_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .context("Failed to open table")
    }

    /// Dimension of the `vector` column of an existing table
    async fn table_dimension(table: &Table) -> Result<Option<usize>> {
        let schema = table.schema().await.context("Failed to read table schema")?;
        let dimension = schema
            .field_with_name("vector")
            .ok()
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => Some(*size as usize),
                _ => None,
            });
        Ok(dimension)
    }

    fn create_record_batch(
        project: &str,
        documents: &[IndexedDocument],
        embeddings: Vec<Vec<f32>>,
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let dimension = embeddings[0].len();
        if embeddings.iter().any(|e| e.len() != dimension) {
            bail!("Embeddings in one batch have different dimensions");
        }

        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            embeddings
                .into_iter()
                .map(|v| Some(v.into_iter().map(Some))),
            dimension as i32,
        );

        let indexed_at = chrono::Utc::now().to_rfc3339();

        let id_array = string_array(documents, |d| d.id.as_str());
        let project_array = StringArray::from(vec![project; documents.len()]);
        let source_array = string_array(documents, |d| d.metadata.source.as_str());
        let type_array = string_array(documents, |d| d.metadata.unit_type.as_str());
        let class_array = StringArray::from(
            documents
                .iter()
                .map(|d| d.metadata.class.as_deref())
                .collect::<Vec<_>>(),
        );
        let name_array = string_array(documents, |d| d.metadata.name.as_str());
        let text_array = string_array(documents, |d| d.text.as_str());
        let indexed_at_array = StringArray::from(vec![indexed_at.as_str(); documents.len()]);

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(vector_array),
                Arc::new(id_array),
                Arc::new(project_array),
                Arc::new(source_array),
                Arc::new(type_array),
                Arc::new(class_array),
                Arc::new(name_array),
                Arc::new(text_array),
                Arc::new(indexed_at_array),
            ],
        )
        .context("Failed to create RecordBatch")
    }

    fn hits_from_batch(batch: &RecordBatch, min_score: f32) -> Result<Vec<SearchHit>> {
        let id = string_column(batch, "id")?;
        let source = string_column(batch, "source")?;
        let unit_type = string_column(batch, "unit_type")?;
        let class = string_column(batch, "class")?;
        let name = string_column(batch, "name")?;
        let text = string_column(batch, "text")?;
        let distance = batch
            .column_by_name("_distance")
            .context("Missing _distance column")?
            .as_any()
            .downcast_ref::<Float32Array>()
            .context("Invalid _distance type")?;

        let mut hits = Vec::new();
        for i in 0..batch.num_rows() {
            let score = 1.0 / (1.0 + distance.value(i));
            if score < min_score {
                continue;
            }

            let kind = UnitKind::parse(unit_type.value(i))
                .with_context(|| format!("Invalid unit type '{}'", unit_type.value(i)))?;

            hits.push(SearchHit {
                id: id.value(i).to_string(),
                text: text.value(i).to_string(),
                metadata: DocumentMetadata {
                    source: source.value(i).to_string(),
                    unit_type: kind,
                    name: name.value(i).to_string(),
                    class: (!class.is_null(i)).then(|| class.value(i).to_string()),
                },
                score,
            });
        }
        Ok(hits)
    }
}

fn string_array(
    documents: &[IndexedDocument],
    field: impl Fn(&IndexedDocument) -> &str,
) -> StringArray {
    StringArray::from(documents.iter().map(field).collect::<Vec<_>>())
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Missing {} column", name))?
        .as_any()
        .downcast_ref::<StringArray>()
        .with_context(|| format!("Invalid {} type", name))
}

/// Quote a value for a Lance SQL filter
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn project_filter(project: &str) -> String {
    format!("project = {}", sql_literal(project))
}

fn ids_filter(project: &str, ids: &[String]) -> String {
    let list: Vec<String> = ids.iter().map(|id| sql_literal(id)).collect();
    format!("{} AND id IN ({})", project_filter(project), list.join(", "))
}

#[async_trait::async_trait]
impl VectorDatabase for LanceVectorDB {
    async fn initialize(&self, dimension: usize) -> Result<()> {
        tracing::info!(
            "Initializing LanceDB with dimension {} at {}",
            dimension,
            self.db_path
        );

        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .context("Failed to list tables")?;

        if table_names.contains(&self.table_name) {
            let table = self.get_table().await?;
            if let Some(existing) = Self::table_dimension(&table).await?
                && existing != dimension
            {
                bail!(
                    "Table '{}' stores {}-dimensional vectors but the embedding model produces {}; run `clear` for each project or use a new table",
                    self.table_name,
                    existing,
                    dimension
                );
            }
            tracing::info!("Table '{}' already exists", self.table_name);
            return Ok(());
        }

        let schema = Self::create_schema(dimension);
        let empty_batch = RecordBatch::new_empty(schema.clone());
        let batches =
            RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema.clone());

        self.connection
            .create_table(&self.table_name, Box::new(batches))
            .execute()
            .await
            .context("Failed to create table")?;

        tracing::info!("Created table '{}'", self.table_name);
        Ok(())
    }

    async fn upsert_documents(
        &self,
        project: &str,
        documents: Vec<IndexedDocument>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize> {
        check_lengths(&documents, &embeddings)?;
        if documents.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();
        self.delete_documents(project, &ids).await?;

        let dimension = embeddings[0].len();
        let schema = Self::create_schema(dimension);
        let batch = Self::create_record_batch(project, &documents, embeddings, schema.clone())?;
        let count = batch.num_rows();

        let table = self.get_table().await?;
        let batches = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);
        table
            .add(Box::new(batches))
            .execute()
            .await
            .context("Failed to add records to table")?;

        tracing::debug!("Stored {} documents for project {}", count, project);
        Ok(count)
    }

    async fn delete_documents(&self, project: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let table = self.get_table().await?;
        let mut deleted = 0;

        for chunk in ids.chunks(DELETE_CHUNK) {
            let filter = ids_filter(project, chunk);
            let present = table
                .count_rows(Some(filter.clone()))
                .await
                .context("Failed to count matching records")?;
            if present == 0 {
                continue;
            }
            table
                .delete(&filter)
                .await
                .context("Failed to delete records")?;
            deleted += present;
        }

        tracing::debug!("Deleted {} documents for project {}", deleted, project);
        Ok(deleted)
    }

    async fn search(
        &self,
        project: &str,
        query_vector: Vec<f32>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchHit>> {
        let table = self.get_table().await?;

        let stream = table
            .vector_search(query_vector)
            .context("Failed to create vector search")?
            .only_if(project_filter(project))
            .limit(limit)
            .execute()
            .await
            .context("Failed to execute search")?;

        let results: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .context("Failed to collect search results")?;

        let mut hits = Vec::new();
        for batch in &results {
            hits.extend(Self::hits_from_batch(batch, min_score)?);
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);

        Ok(hits)
    }

    async fn count_documents(&self, project: &str) -> Result<usize> {
        let table = self.get_table().await?;
        table
            .count_rows(Some(project_filter(project)))
            .await
            .context("Failed to count rows")
    }

    async fn clear_project(&self, project: &str) -> Result<usize> {
        let table = self.get_table().await?;
        let filter = project_filter(project);

        let count = table
            .count_rows(Some(filter.clone()))
            .await
            .context("Failed to count rows")?;
        if count > 0 {
            table
                .delete(&filter)
                .await
                .context("Failed to delete project records")?;
        }

        tracing::info!("Cleared {} documents for project {}", count, project);
        Ok(count)
    }
}
