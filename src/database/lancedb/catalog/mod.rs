#[cfg(test)]
mod tests;

use arrow::array::{RecordBatchIterator, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    VectorDatabase, count_matching, database_error, distance_at, nearest_batches,
    optional_string, scan_batches, string_column, vector_array, vector_field,
};
use crate::course::{Course, Lesson};
use crate::database::{CatalogIndex, quote_literal};
use crate::embeddings::EmbeddingProvider;
use crate::{RagError, Result};

pub const CATALOG_TABLE: &str = "course_catalog";

/// Nearest neighbours inspected per resolve round
const RESOLVE_CANDIDATES: usize = 5;

/// Catalog index stored in the `course_catalog` LanceDB table. One row per
/// course, embedded from the course title.
pub struct LanceCatalogIndex {
    database: VectorDatabase,
    embedder: Arc<dyn EmbeddingProvider>,
    schema: SchemaRef,
}

impl LanceCatalogIndex {
    #[inline]
    pub async fn open(
        database: VectorDatabase,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let schema = catalog_schema(embedder.dimensions());
        database.ensure_table(CATALOG_TABLE, schema.clone()).await?;

        Ok(Self {
            database,
            embedder,
            schema,
        })
    }

    fn record_batch(&self, course: &Course, vector: Vec<f32>) -> Result<RecordBatch> {
        let lessons_json = serde_json::to_string(&course.lessons)
            .map_err(|e| database_error("Failed to serialize lessons", e))?;
        let lesson_count = u32::try_from(course.lessons.len()).unwrap_or(u32::MAX);

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(vec![course.title.as_str()])),
            Arc::new(vector_array(&[vector], self.embedder.dimensions())?),
            Arc::new(StringArray::from(vec![course.title.as_str()])),
            Arc::new(StringArray::from(vec![course.instructor.as_deref()])),
            Arc::new(StringArray::from(vec![course.course_link.as_deref()])),
            Arc::new(StringArray::from(vec![lessons_json])),
            Arc::new(UInt32Array::from(vec![lesson_count])),
            Arc::new(StringArray::from(vec![Utc::now().to_rfc3339()])),
        ];

        RecordBatch::try_new(self.schema.clone(), arrays)
            .map_err(|e| database_error("Failed to create record batch", e))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder
            .embed(text)
            .await
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))
    }
}

fn catalog_schema(dimension: usize) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        vector_field(dimension),
        Field::new("title", DataType::Utf8, false),
        Field::new("instructor", DataType::Utf8, true),
        Field::new("course_link", DataType::Utf8, true),
        Field::new("lessons_json", DataType::Utf8, false),
        Field::new("lesson_count", DataType::UInt32, false),
        Field::new("indexed_at", DataType::Utf8, false),
    ]))
}

fn parse_courses(batches: &[RecordBatch]) -> Result<Vec<Course>> {
    let mut courses = Vec::new();

    for batch in batches {
        let titles = string_column(batch, "title")?;
        let instructors = string_column(batch, "instructor")?;
        let links = string_column(batch, "course_link")?;
        let lessons = string_column(batch, "lessons_json")?;

        for row in 0..batch.num_rows() {
            let lessons: Vec<Lesson> = serde_json::from_str(lessons.value(row))
                .map_err(|e| database_error("Failed to parse stored lessons", e))?;

            courses.push(Course {
                title: titles.value(row).to_string(),
                course_link: optional_string(links, row),
                instructor: optional_string(instructors, row),
                lessons,
            });
        }
    }

    Ok(courses)
}

/// `(distance, title)` pairs, nearest first, equal distances by title
fn ranked_titles(batches: &[RecordBatch]) -> Result<Vec<(f32, String)>> {
    let mut ranked = Vec::new();
    for batch in batches {
        let titles = string_column(batch, "title")?;
        for row in 0..batch.num_rows() {
            ranked.push((distance_at(batch, row), titles.value(row).to_string()));
        }
    }

    ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    Ok(ranked)
}

#[async_trait]
impl CatalogIndex for LanceCatalogIndex {
    async fn upsert(&self, course: &Course) -> Result<()> {
        debug!("Upserting catalog entry for course: {}", course.title);

        let vector = self.embed(&course.title).await?;
        let batch = self.record_batch(course, vector)?;
        let table = self.database.open_table(CATALOG_TABLE).await?;

        table
            .delete(&format!("id = {}", quote_literal(&course.title)))
            .await
            .map_err(|e| database_error("Failed to remove previous catalog entry", e))?;

        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| database_error("Failed to insert catalog entry", e))?;

        info!("Catalog entry stored for course: {}", course.title);
        Ok(())
    }

    async fn resolve(&self, name_hint: &str) -> Result<Option<String>> {
        let table = self.database.open_table(CATALOG_TABLE).await?;
        let total = count_matching(&table, None).await?;
        if total == 0 {
            return Ok(None);
        }

        let vector = self.embed(name_hint).await?;

        // Widen the candidate window until the nearest distance is not shared
        // by the last candidate, so equal-distance titles are all compared.
        let mut candidates = RESOLVE_CANDIDATES.min(total);
        let ranked = loop {
            let batches = nearest_batches(&table, &vector, None, candidates).await?;
            let ranked = ranked_titles(&batches)?;
            let tied_at_edge = ranked.len() == candidates
                && ranked.first().map(|r| r.0) == ranked.last().map(|r| r.0);
            if !tied_at_edge || candidates >= total {
                break ranked;
            }
            candidates = candidates.saturating_mul(2).min(total);
        };

        let resolved = ranked.into_iter().next().map(|(distance, title)| {
            debug!(
                "Resolved course hint '{}' to '{}' (distance {:.4})",
                name_hint, title, distance
            );
            title
        });
        Ok(resolved)
    }

    async fn get(&self, title: &str) -> Result<Option<Course>> {
        let table = self.database.open_table(CATALOG_TABLE).await?;
        let predicate = format!("id = {}", quote_literal(title));
        let batches = scan_batches(&table, Some(&predicate)).await?;
        Ok(parse_courses(&batches)?.into_iter().next())
    }

    async fn titles(&self) -> Result<Vec<String>> {
        let table = self.database.open_table(CATALOG_TABLE).await?;
        let batches = scan_batches(&table, None).await?;

        let mut titles = Vec::new();
        for batch in &batches {
            let column = string_column(batch, "title")?;
            titles.extend((0..batch.num_rows()).map(|row| column.value(row).to_string()));
        }
        titles.sort();
        Ok(titles)
    }

    async fn count(&self) -> Result<usize> {
        let table = self.database.open_table(CATALOG_TABLE).await?;
        count_matching(&table, None).await
    }

    async fn delete(&self, title: &str) -> Result<()> {
        let table = self.database.open_table(CATALOG_TABLE).await?;
        table
            .delete(&format!("id = {}", quote_literal(title)))
            .await
            .map_err(|e| database_error("Failed to delete catalog entry", e))?;

        info!("Deleted catalog entry for course: {}", title);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.database
            .reset_table(CATALOG_TABLE, self.schema.clone())
            .await?;
        info!("Cleared course catalog");
        Ok(())
    }
}
