
use arrow::array::{Array, RecordBatchIterator, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    VectorDatabase, count_matching, database_error, distance_at, nearest_batches, string_column,
    u32_column, vector_array, vector_field,
};
use crate::course::Chunk;
use crate::database::{ContentIndex, SearchFilter, SearchResult, quote_literal, sort_results};
use crate::embeddings::EmbeddingProvider;
use crate::{RagError, Result};

pub const CONTENT_TABLE: &str = "course_content";

/// Content index stored in the `course_content` LanceDB table. One row per
/// chunk, keyed by `"{course_title}_{chunk_index}"`.
pub struct LanceContentIndex {
    database: VectorDatabase,
    embedder: Arc<dyn EmbeddingProvider>,
    schema: SchemaRef,
}

impl LanceContentIndex {
    #[inline]
    pub async fn open(
        database: VectorDatabase,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let schema = content_schema(embedder.dimensions());
        database.ensure_table(CONTENT_TABLE, schema.clone()).await?;

        Ok(Self {
            database,
            embedder,
            schema,
        })
    }

    async fn record_batch(&self, chunks: &[Chunk]) -> Result<RecordBatch> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        if vectors.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "provider returned {} embeddings for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let ids: Vec<String> = chunks.iter().map(Chunk::address).collect();
        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array(&vectors, self.embedder.dimensions())?),
            Arc::new(StringArray::from(
                chunks
                    .iter()
                    .map(|c| c.course_title.as_str())
                    .collect::<Vec<_>>(),
            )),
            Arc::new(UInt32Array::from(
                chunks.iter().map(|c| c.lesson_number).collect::<Vec<_>>(),
            )),
            Arc::new(UInt32Array::from(
                chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(texts)),
        ];

        RecordBatch::try_new(self.schema.clone(), arrays)
            .map_err(|e| database_error("Failed to create record batch", e))
    }

    async fn add_chunks(&self, chunks: &[Chunk], table: &lancedb::Table) -> Result<()> {
        let batch = self.record_batch(chunks).await?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| database_error("Failed to insert chunks", e))?;
        Ok(())
    }

    async fn delete_where(&self, predicate: &str) -> Result<()> {
        let table = self.database.open_table(CONTENT_TABLE).await?;
        table
            .delete(predicate)
            .await
            .map_err(|e| database_error("Failed to delete chunks", e))?;
        Ok(())
    }
}

fn content_schema(dimension: usize) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        vector_field(dimension),
        Field::new("course_title", DataType::Utf8, false),
        Field::new("lesson_number", DataType::UInt32, true),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("content", DataType::Utf8, false),
    ]))
}

fn parse_results(batches: &[RecordBatch]) -> Result<Vec<SearchResult>> {
    let mut results = Vec::new();

    for batch in batches {
        let titles = string_column(batch, "course_title")?;
        let lessons = u32_column(batch, "lesson_number")?;
        let indices = u32_column(batch, "chunk_index")?;
        let contents = string_column(batch, "content")?;

        for row in 0..batch.num_rows() {
            results.push(SearchResult {
                content: contents.value(row).to_string(),
                course_title: titles.value(row).to_string(),
                lesson_number: (!lessons.is_null(row)).then(|| lessons.value(row)),
                chunk_index: indices.value(row),
                distance: distance_at(batch, row),
            });
        }
    }

    Ok(results)
}

#[async_trait]
impl ContentIndex for LanceContentIndex {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            debug!("No chunks to store");
            return Ok(());
        }

        let table = self.database.open_table(CONTENT_TABLE).await?;
        let addresses = chunks
            .iter()
            .map(|chunk| quote_literal(&chunk.address()))
            .join(", ");
        table
            .delete(&format!("id IN ({})", addresses))
            .await
            .map_err(|e| database_error("Failed to remove previous chunks", e))?;

        self.add_chunks(chunks, &table).await?;
        info!("Stored {} chunks", chunks.len());
        Ok(())
    }

    async fn replace_course(&self, course_title: &str, chunks: &[Chunk]) -> Result<()> {
        if let Some(stray) = chunks.iter().find(|c| c.course_title != course_title) {
            return Err(RagError::Other(anyhow::anyhow!(
                "chunk {} does not belong to course '{}'",
                stray.address(),
                course_title
            )));
        }

        self.delete_course(course_title).await?;
        if chunks.is_empty() {
            return Ok(());
        }

        let table = self.database.open_table(CONTENT_TABLE).await?;
        self.add_chunks(chunks, &table).await?;
        info!(
            "Replaced content of course '{}' with {} chunks",
            course_title,
            chunks.len()
        );
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let table = self.database.open_table(CONTENT_TABLE).await?;
        let predicate = filter.predicate();
        let total = count_matching(&table, predicate.as_deref()).await?;
        if total == 0 {
            debug!("No chunks match filter {:?}", filter);
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        // Keep widening while the last candidate ties the limit-th distance,
        // otherwise a lower chunk index at that distance could be cut off.
        let mut candidates = limit.saturating_mul(2).min(total);
        let mut results = loop {
            let batches =
                nearest_batches(&table, &vector, predicate.as_deref(), candidates).await?;
            let mut results = parse_results(&batches)?;
            sort_results(&mut results);

            let boundary = results.get(limit - 1).map(|r| r.distance);
            let last = results.last().map(|r| r.distance);
            let exhausted = results.len() < candidates || candidates >= total;
            if exhausted || boundary.is_none() || last > boundary {
                break results;
            }
            candidates = candidates.saturating_mul(2).min(total);
        };

        results.truncate(limit);
        debug!(
            "Content search returned {} results (filter {:?})",
            results.len(),
            filter
        );
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let table = self.database.open_table(CONTENT_TABLE).await?;
        count_matching(&table, None).await
    }

    async fn count_for_course(&self, course_title: &str) -> Result<usize> {
        let table = self.database.open_table(CONTENT_TABLE).await?;
        let predicate = format!("course_title = {}", quote_literal(course_title));
        count_matching(&table, Some(&predicate)).await
    }

    async fn delete_course(&self, course_title: &str) -> Result<()> {
        self.delete_where(&format!("course_title = {}", quote_literal(course_title)))
            .await?;
        debug!("Deleted chunks for course: {}", course_title);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.database
            .reset_table(CONTENT_TABLE, self.schema.clone())
            .await?;
        info!("Cleared course content");
        Ok(())
    }
}
