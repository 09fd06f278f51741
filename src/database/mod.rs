// Database module
// Catalog and content indices: the two keyed embedding stores behind retrieval

#[cfg(test)]
mod tests;

pub mod lancedb;

use async_trait::async_trait;

use crate::Result;
use crate::course::{Chunk, Course};

pub use self::lancedb::{LanceCatalogIndex, LanceContentIndex, VectorDatabase};

/// Equality constraints applied to a content search. Absent fields impose no
/// constraint; present fields are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl SearchFilter {
    #[inline]
    pub fn new(course_title: Option<String>, lesson_number: Option<u32>) -> Self {
        Self {
            course_title,
            lesson_number,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.course_title.is_none() && self.lesson_number.is_none()
    }

    /// SQL predicate for the filter, `None` when unconstrained
    #[inline]
    pub fn predicate(&self) -> Option<String> {
        let mut clauses = Vec::with_capacity(2);
        if let Some(title) = &self.course_title {
            clauses.push(format!("course_title = {}", quote_literal(title)));
        }
        if let Some(lesson_number) = self.lesson_number {
            clauses.push(format!("lesson_number = {}", lesson_number));
        }

        (!clauses.is_empty()).then(|| clauses.join(" AND "))
    }
}

/// One content search hit
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: u32,
    /// Cosine distance to the query, 0 is identical
    pub distance: f32,
}

/// Per-course embedding store used to resolve fuzzy course names
#[async_trait]
pub trait CatalogIndex: Send + Sync {
    /// Insert or replace the catalog entry keyed by `course.title`
    async fn upsert(&self, course: &Course) -> Result<()>;

    /// Nearest course title to `name_hint`. `None` only when the catalog is
    /// empty; there is no similarity cutoff.
    async fn resolve(&self, name_hint: &str) -> Result<Option<String>>;

    async fn get(&self, title: &str) -> Result<Option<Course>>;

    /// All course titles, sorted
    async fn titles(&self) -> Result<Vec<String>>;

    async fn count(&self) -> Result<usize>;

    async fn delete(&self, title: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Per-chunk embedding store used for filtered content search
#[async_trait]
pub trait ContentIndex: Send + Sync {
    /// Store chunks keyed by their `(course_title, chunk_index)` address,
    /// replacing any row with the same address
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Drop every chunk of `course_title`, then store `chunks`
    async fn replace_course(&self, course_title: &str, chunks: &[Chunk]) -> Result<()>;

    /// Results ascending by distance, ties broken by chunk index, truncated
    /// to `limit`
    async fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<SearchResult>>;

    async fn count(&self) -> Result<usize>;

    async fn count_for_course(&self, course_title: &str) -> Result<usize>;

    async fn delete_course(&self, course_title: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Quote a string literal for a filter predicate
#[inline]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Deterministic result order: distance, then chunk index, then course title
#[inline]
pub fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.chunk_index.cmp(&b.chunk_index))
            .then_with(|| a.course_title.cmp(&b.course_title))
    });
}
