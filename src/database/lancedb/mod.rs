// LanceDB storage for the catalog and content indices
// Connection handling, table lifecycle and Arrow column helpers shared by both stores


pub mod catalog;
pub mod content;

use arrow::array::{Array, FixedSizeListArray, Float32Array, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, SchemaRef};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{RagError, Result};

pub use catalog::LanceCatalogIndex;
pub use content::LanceContentIndex;

/// Shared LanceDB connection holding both index tables
#[derive(Clone)]
pub struct VectorDatabase {
    connection: Connection,
    path: PathBuf,
}

impl VectorDatabase {
    /// Connect to (or create) the database directory at `path`
    #[inline]
    pub async fn open(path: &Path) -> Result<Self> {
        debug!("Initializing LanceDB at path: {:?}", path);

        std::fs::create_dir_all(path).map_err(|e| {
            database_error("Failed to create vector database directory", e)
        })?;

        let uri = format!("file://{}", path.display());

        let connection = match lancedb::connect(&uri).execute().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to connect to LanceDB: {}", e);

                if looks_corrupted(&e.to_string()) {
                    warn!("Database corruption detected, attempting recovery");
                    Self::attempt_corruption_recovery(path)?;
                    std::fs::create_dir_all(path).map_err(|e| {
                        database_error("Failed to recreate vector database directory", e)
                    })?;

                    lancedb::connect(&uri).execute().await.map_err(|e| {
                        database_error("Failed to connect to LanceDB after recovery", e)
                    })?
                } else {
                    return Err(database_error("Failed to connect to LanceDB", e));
                }
            }
        };

        Ok(Self {
            connection,
            path: path.to_path_buf(),
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub async fn table_names(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| database_error("Failed to list tables", e))
    }

    /// Make sure `name` exists with `schema`. An existing table whose columns
    /// or vector dimension differ is dropped and recreated; its embeddings are
    /// derived data and must be re-ingested.
    pub(crate) async fn ensure_table(&self, name: &str, schema: SchemaRef) -> Result<()> {
        if self.table_names().await?.iter().any(|t| t == name) {
            let table = self.open_table(name).await?;
            let existing = table
                .schema()
                .await
                .map_err(|e| database_error("Failed to get table schema", e))?;

            if schema_matches(&existing, &schema) {
                debug!("Table {} already exists with matching schema", name);
                return Ok(());
            }

            warn!(
                "Table {} has vector dimension {:?}, expected {:?}; recreating it (stored courses must be re-ingested)",
                name,
                vector_dimension(&existing),
                vector_dimension(&schema)
            );
            self.drop_table_if_exists(name).await?;
        }

        self.connection
            .create_empty_table(name, schema)
            .execute()
            .await
            .map_err(|e| database_error(&format!("Failed to create table {}", name), e))?;

        info!("Created table {}", name);
        Ok(())
    }

    pub(crate) async fn open_table(&self, name: &str) -> Result<Table> {
        self.connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| database_error(&format!("Failed to open table {}", name), e))
    }

    /// Drop and recreate `name` with an empty table
    pub(crate) async fn reset_table(&self, name: &str, schema: SchemaRef) -> Result<()> {
        self.drop_table_if_exists(name).await?;
        self.connection
            .create_empty_table(name, schema)
            .execute()
            .await
            .map_err(|e| database_error(&format!("Failed to recreate table {}", name), e))?;
        Ok(())
    }

    async fn drop_table_if_exists(&self, name: &str) -> Result<()> {
        if self.table_names().await?.iter().any(|t| t == name) {
            info!("Dropping table {}", name);
            self.connection
                .drop_table(name)
                .await
                .map_err(|e| database_error("Failed to drop table", e))?;
        }
        Ok(())
    }

    fn attempt_corruption_recovery(db_path: &Path) -> Result<()> {
        warn!("Attempting database corruption recovery at {:?}", db_path);

        if db_path.exists() {
            let backup_path = db_path.with_extension("corrupted_backup");
            if let Err(e) = std::fs::rename(db_path, &backup_path) {
                error!("Failed to backup corrupted database: {}", e);
            } else {
                info!("Corrupted database backed up to {:?}", backup_path);
            }
        }

        if db_path.exists() {
            std::fs::remove_dir_all(db_path)
                .map_err(|e| database_error("Failed to remove corrupted database", e))?;
        }

        Ok(())
    }
}

#[inline]
pub(crate) fn database_error(context: &str, err: impl Display) -> RagError {
    RagError::Database(format!("{}: {}", context, err))
}

fn looks_corrupted(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("corrupt") || message.contains("invalid") || message.contains("malformed")
}

/// Fixed-size list field used for every `vector` column
#[inline]
pub(crate) fn vector_field(dimension: usize) -> Field {
    Field::new(
        "vector",
        DataType::FixedSizeList(
            Arc::new(Field::new("item", DataType::Float32, false)),
            dimension as i32,
        ),
        false,
    )
}

pub(crate) fn vector_dimension(schema: &SchemaRef) -> Option<usize> {
    schema
        .field_with_name("vector")
        .ok()
        .and_then(|field| match field.data_type() {
            DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
            _ => None,
        })
}

fn schema_matches(existing: &SchemaRef, expected: &SchemaRef) -> bool {
    let names = |schema: &SchemaRef| -> Vec<String> {
        schema.fields().iter().map(|f| f.name().clone()).collect()
    };
    names(existing) == names(expected) && vector_dimension(existing) == vector_dimension(expected)
}

/// Pack equally sized vectors into a `FixedSizeListArray`
pub(crate) fn vector_array(vectors: &[Vec<f32>], dimension: usize) -> Result<FixedSizeListArray> {
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(RagError::Embedding(format!(
            "embedding has {} dimensions, expected {}",
            bad.len(),
            dimension
        )));
    }

    let flat_values: Vec<f32> = vectors.iter().flatten().copied().collect();
    let field = Arc::new(Field::new("item", DataType::Float32, false));
    FixedSizeListArray::try_new(
        field,
        dimension as i32,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| database_error("Failed to create vector array", e))
}

pub(crate) fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

pub(crate) fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

#[inline]
pub(crate) fn optional_string(column: &StringArray, row: usize) -> Option<String> {
    (!column.is_null(row)).then(|| column.value(row).to_string())
}

/// `_distance` for `row`; vector queries always return the column
pub(crate) fn distance_at(batch: &RecordBatch, row: usize) -> f32 {
    batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>())
        .map_or(f32::MAX, |d| if d.is_null(row) { f32::MAX } else { d.value(row) })
}

/// Cosine nearest-neighbour query returning the raw record batches
pub(crate) async fn nearest_batches(
    table: &Table,
    vector: &[f32],
    predicate: Option<&str>,
    limit: usize,
) -> Result<Vec<RecordBatch>> {
    let mut query = table
        .vector_search(vector)
        .map_err(|e| database_error("Failed to create vector search", e))?
        .column("vector")
        .distance_type(DistanceType::Cosine)
        .limit(limit);

    if let Some(predicate) = predicate {
        query = query.only_if(predicate);
    }

    let stream = query
        .execute()
        .await
        .map_err(|e| database_error("Failed to execute search", e))?;

    stream
        .try_collect()
        .await
        .map_err(|e| database_error("Failed to read result stream", e))
}

/// Every row matching `predicate`
pub(crate) async fn scan_batches(table: &Table, predicate: Option<&str>) -> Result<Vec<RecordBatch>> {
    let total = table
        .count_rows(predicate.map(str::to_string))
        .await
        .map_err(|e| database_error("Failed to count rows", e))?;
    if total == 0 {
        return Ok(Vec::new());
    }

    let mut query = table.query().limit(total);
    if let Some(predicate) = predicate {
        query = query.only_if(predicate);
    }

    let stream = query
        .execute()
        .await
        .map_err(|e| database_error("Failed to execute scan", e))?;

    stream
        .try_collect()
        .await
        .map_err(|e| database_error("Failed to read scan stream", e))
}

pub(crate) async fn count_matching(table: &Table, predicate: Option<&str>) -> Result<usize> {
    table
        .count_rows(predicate.map(str::to_string))
        .await
        .map_err(|e| database_error("Failed to count rows", e))
}
