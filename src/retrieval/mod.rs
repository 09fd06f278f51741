// Retrieval coordinator
// Resolves course-name hints through the catalog, then runs the filtered content search


use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::course::Course;
use crate::database::{CatalogIndex, ContentIndex, SearchFilter};
use crate::{RagError, Result};

/// A content query plus optional course and lesson hints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalRequest {
    pub query: String,
    /// Free-text course name, resolved to the nearest catalog title
    pub course_name: Option<String>,
    pub lesson_number: Option<u32>,
    /// Overrides the coordinator's default result count
    pub limit: Option<usize>,
}

impl RetrievalRequest {
    #[inline]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_course(mut self, course_name: impl Into<String>) -> Self {
        self.course_name = Some(course_name.into());
        self
    }

    #[inline]
    pub fn with_lesson(mut self, lesson_number: u32) -> Self {
        self.lesson_number = Some(lesson_number);
        self
    }

    #[inline]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One ranked hit. Ranks start at 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub rank: usize,
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: u32,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Lesson,
    Course,
}

/// Citation entry for one returned chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// `"{course} - Lesson {n}"`, or the bare course title
    pub label: String,
    pub link: Option<String>,
    pub kind: SourceKind,
}

/// Results of one `retrieve` call together with their sources, in rank order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Retrieval {
    /// Catalog title the course hint resolved to
    pub resolved_course: Option<String>,
    pub results: Vec<RankedResult>,
    pub sources: Vec<Source>,
}

impl Retrieval {
    /// Nothing matched. Distinct from a failed search, which is an `Err`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// `"{course} - Lesson {n}"`, omitting the lesson suffix when absent
#[inline]
pub fn source_label(course_title: &str, lesson_number: Option<u32>) -> String {
    match lesson_number {
        Some(n) => format!("{} - Lesson {}", course_title, n),
        None => course_title.to_string(),
    }
}

/// Joins the catalog and content indices. Holds no per-query state, so one
/// instance can serve concurrent queries.
#[derive(Clone)]
pub struct RetrievalCoordinator {
    catalog: Arc<dyn CatalogIndex>,
    content: Arc<dyn ContentIndex>,
    default_limit: usize,
}

impl RetrievalCoordinator {
    #[inline]
    pub fn new(
        catalog: Arc<dyn CatalogIndex>,
        content: Arc<dyn ContentIndex>,
        default_limit: usize,
    ) -> Self {
        Self {
            catalog,
            content,
            default_limit: default_limit.max(1),
        }
    }

    /// Resolve the course hint, build the filter and search content with the
    /// original query text.
    ///
    /// A hint against an empty catalog is `RagError::NoCoursesIndexed`; no
    /// match is an empty, successful `Retrieval`.
    pub async fn retrieve(&self, request: &RetrievalRequest) -> Result<Retrieval> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidQuery(
                "query text must not be empty".to_string(),
            ));
        }

        let course_hint = request
            .course_name
            .as_deref()
            .map(str::trim)
            .filter(|hint| !hint.is_empty());

        let resolved_course = match course_hint {
            Some(hint) => Some(
                self.catalog
                    .resolve(hint)
                    .await?
                    .ok_or(RagError::NoCoursesIndexed)?,
            ),
            None => None,
        };

        let filter = SearchFilter::new(resolved_course.clone(), request.lesson_number);
        let limit = request.limit.unwrap_or(self.default_limit).max(1);

        debug!(
            "Retrieving '{}' with filter {:?} (limit {})",
            query, filter, limit
        );
        let hits = self.content.search(query, &filter, limit).await?;

        let results: Vec<RankedResult> = hits
            .into_iter()
            .enumerate()
            .map(|(position, hit)| RankedResult {
                rank: position + 1,
                content: hit.content,
                course_title: hit.course_title,
                lesson_number: hit.lesson_number,
                chunk_index: hit.chunk_index,
                distance: hit.distance,
            })
            .collect();

        let sources = self.sources_for(&results).await;

        Ok(Retrieval {
            resolved_course,
            results,
            sources,
        })
    }

    /// Full course metadata for the course nearest to `course_hint`
    pub async fn outline(&self, course_hint: &str) -> Result<Course> {
        let hint = course_hint.trim();
        if hint.is_empty() {
            return Err(RagError::InvalidQuery(
                "course name must not be empty".to_string(),
            ));
        }

        let title = self
            .catalog
            .resolve(hint)
            .await?
            .ok_or(RagError::NoCoursesIndexed)?;

        self.catalog.get(&title).await?.ok_or_else(|| {
            RagError::Database(format!("catalog entry for '{}' could not be read", title))
        })
    }

    async fn sources_for(&self, results: &[RankedResult]) -> Vec<Source> {
        let mut courses: HashMap<&str, Option<Course>> = HashMap::new();
        let mut sources = Vec::with_capacity(results.len());

        for result in results {
            let title = result.course_title.as_str();
            if !courses.contains_key(title) {
                let course = match self.catalog.get(title).await {
                    Ok(course) => course,
                    Err(e) => {
                        warn!("Could not look up links for course '{}': {}", title, e);
                        None
                    }
                };
                courses.insert(title, course);
            }

            let link = courses
                .get(title)
                .and_then(Option::as_ref)
                .and_then(|course| course.link_for(result.lesson_number))
                .map(str::to_string);

            sources.push(Source {
                label: source_label(title, result.lesson_number),
                link,
                kind: if result.lesson_number.is_some() {
                    SourceKind::Lesson
                } else {
                    SourceKind::Course
                },
            });
        }

        sources
    }
}
