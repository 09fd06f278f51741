// Indexer module
// Turns course documents into catalog entries and content chunks

#[cfg(test)]
mod tests;

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::course::{CourseDocument, parse_course_document};
use crate::database::{CatalogIndex, ContentIndex};
use crate::embeddings::chunking::{ChunkingConfig, chunk_course};
use crate::{RagError, Result};

/// Extensions read as plain-text course documents
const TEXT_EXTENSIONS: &[&str] = &["txt"];
/// Formats whose text extraction happens outside this crate
const EXTERNAL_EXTENSIONS: &[&str] = &["pdf", "docx"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Leave documents whose course title is already in the catalog untouched
    pub skip_existing: bool,
}

/// A course written to both indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedCourse {
    pub title: String,
    pub lesson_count: usize,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    Ingested(IngestedCourse),
    SkippedExisting { title: String },
    Unsupported,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub outcome: DocumentOutcome,
}

/// Per-document outcomes of a folder ingestion, in file-name order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub documents: Vec<DocumentReport>,
}

impl IngestionReport {
    #[inline]
    pub fn ingested(&self) -> impl Iterator<Item = &IngestedCourse> {
        self.documents.iter().filter_map(|d| match &d.outcome {
            DocumentOutcome::Ingested(course) => Some(course),
            _ => None,
        })
    }

    #[inline]
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.documents.iter().filter_map(|d| match &d.outcome {
            DocumentOutcome::Failed { error } => Some((d.path.as_path(), error.as_str())),
            _ => None,
        })
    }

    #[inline]
    pub fn total_chunks(&self) -> usize {
        self.ingested().map(|course| course.chunk_count).sum()
    }
}

/// Summary of what the indices hold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    /// Sorted
    pub course_titles: Vec<String>,
    pub total_chunks: usize,
}

/// Write path: document text -> parsed course -> chunks -> both indices
pub struct Indexer {
    catalog: Arc<dyn CatalogIndex>,
    content: Arc<dyn ContentIndex>,
    chunking: ChunkingConfig,
}

impl Indexer {
    #[inline]
    pub fn new(
        catalog: Arc<dyn CatalogIndex>,
        content: Arc<dyn ContentIndex>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            catalog,
            content,
            chunking,
        }
    }

    /// Parse and store one document. Re-ingesting a title replaces all of its
    /// previous chunks.
    pub async fn ingest_text(&self, text: &str) -> Result<IngestedCourse> {
        let document = parse_course_document(text)?;
        self.store_document(document).await
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<IngestedCourse> {
        if !has_extension(path, TEXT_EXTENSIONS) {
            return Err(RagError::DocumentParse(format!(
                "{} is not a plain-text course document",
                path.display()
            )));
        }

        let text = fs::read_to_string(path).await?;
        self.ingest_text(&text).await.map_err(|e| match e {
            RagError::DocumentParse(message) => {
                RagError::DocumentParse(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Ingest every course document in `dir`, sorted by file name. A failing
    /// document is recorded in the report and the rest still run.
    pub async fn ingest_folder(
        &self,
        dir: &Path,
        options: IngestOptions,
    ) -> Result<IngestionReport> {
        let paths = course_files(dir).await?;
        info!(
            "Found {} candidate documents in {}",
            paths.len(),
            dir.display()
        );

        let existing = if options.skip_existing {
            self.catalog.titles().await?
        } else {
            Vec::new()
        };

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(paths.len() as u64).with_style(
                ProgressStyle::with_template("{bar:30} [{pos}/{len}] Ingesting {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut report = IngestionReport::default();
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            bar.set_message(name);

            let outcome = self.ingest_folder_entry(&path, &existing).await;
            bar.inc(1);
            report.documents.push(DocumentReport { path, outcome });
        }
        bar.finish_and_clear();

        info!(
            "Ingested {} courses ({} chunks), {} failures",
            report.ingested().count(),
            report.total_chunks(),
            report.failures().count()
        );
        Ok(report)
    }

    async fn ingest_folder_entry(&self, path: &Path, existing: &[String]) -> DocumentOutcome {
        if has_extension(path, EXTERNAL_EXTENSIONS) {
            warn!(
                "Skipping {}: text extraction for this format is external",
                path.display()
            );
            return DocumentOutcome::Unsupported;
        }

        let document = match read_document(path).await {
            Ok(document) => document,
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                return DocumentOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        if existing.contains(&document.course.title) {
            debug!("Course already indexed: {}", document.course.title);
            return DocumentOutcome::SkippedExisting {
                title: document.course.title,
            };
        }

        match self.store_document(document).await {
            Ok(course) => DocumentOutcome::Ingested(course),
            Err(e) => {
                error!("Failed to ingest {}: {}", path.display(), e);
                DocumentOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn store_document(&self, document: CourseDocument) -> Result<IngestedCourse> {
        let CourseDocument { course, sections } = document;
        let chunks = chunk_course(&course.title, &sections, &self.chunking);

        self.content.replace_course(&course.title, &chunks).await?;
        self.catalog.upsert(&course).await?;

        info!(
            "Ingested course '{}': {} lessons, {} chunks",
            course.title,
            course.lessons.len(),
            chunks.len()
        );
        Ok(IngestedCourse {
            title: course.title,
            lesson_count: course.lessons.len(),
            chunk_count: chunks.len(),
        })
    }

    /// Remove a course from both indices
    pub async fn delete_course(&self, title: &str) -> Result<()> {
        self.content.delete_course(title).await?;
        self.catalog.delete(title).await?;
        info!("Deleted course '{}'", title);
        Ok(())
    }

    /// Empty both indices
    pub async fn clear(&self) -> Result<()> {
        self.content.clear().await?;
        self.catalog.clear().await?;
        Ok(())
    }

    pub async fn analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.catalog.titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
            total_chunks: self.content.count().await?,
        })
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

async fn read_document(path: &Path) -> Result<CourseDocument> {
    let text = fs::read_to_string(path).await?;
    parse_course_document(&text)
}

/// Regular files in `dir` with a text or externally extracted extension
async fn course_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut paths = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if has_extension(&path, TEXT_EXTENSIONS) || has_extension(&path, EXTERNAL_EXTENSIONS) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}
