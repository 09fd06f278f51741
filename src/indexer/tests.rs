use super::*;
use crate::database::{LanceCatalogIndex, LanceContentIndex, SearchFilter, VectorDatabase};
use crate::embeddings::{EmbeddingProvider, HashingEmbedder};
use tempfile::TempDir;

const MCP_COURSE: &str = "Course Title: Intro to MCP
Course Link: https://example.com/mcp
Course Instructor: Ada Lovelace

Lesson 0: Overview
Lesson Link: https://example.com/mcp/0
MCP lets models call tools. It defines a protocol.

Lesson 1: Setup
Install the SDK. Configure credentials.
";

const K8S_COURSE: &str = "Course Title: Advanced Kubernetes

Lesson 1: Scheduling
Kubernetes schedules pods onto nodes.
";

struct Harness {
    indexer: Indexer,
    catalog: Arc<LanceCatalogIndex>,
    content: Arc<LanceContentIndex>,
    _temp_dir: TempDir,
}

async fn harness(chunking: ChunkingConfig) -> Harness {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::default());
    let database = VectorDatabase::open(&temp_dir.path().join("vectors"))
        .await
        .expect("should open database");
    let catalog = Arc::new(
        LanceCatalogIndex::open(database.clone(), embedder.clone())
            .await
            .expect("should open catalog"),
    );
    let content = Arc::new(
        LanceContentIndex::open(database, embedder)
            .await
            .expect("should open content"),
    );

    Harness {
        indexer: Indexer::new(catalog.clone(), content.clone(), chunking),
        catalog,
        content,
        _temp_dir: temp_dir,
    }
}

#[tokio::test]
async fn ingest_text_writes_both_indices() {
    let h = harness(ChunkingConfig::default()).await;

    let ingested = h
        .indexer
        .ingest_text(MCP_COURSE)
        .await
        .expect("should ingest");

    assert_eq!(
        ingested,
        IngestedCourse {
            title: "Intro to MCP".to_string(),
            lesson_count: 2,
            chunk_count: 2,
        }
    );

    let course = h
        .catalog
        .get("Intro to MCP")
        .await
        .expect("should get")
        .expect("course stored");
    assert_eq!(course.instructor.as_deref(), Some("Ada Lovelace"));
    assert_eq!(
        course.lessons[0].lesson_link.as_deref(),
        Some("https://example.com/mcp/0")
    );
    assert_eq!(
        h.content
            .count_for_course("Intro to MCP")
            .await
            .expect("should count"),
        2
    );
}

#[tokio::test]
async fn malformed_document_is_a_parse_error() {
    let h = harness(ChunkingConfig::default()).await;

    let err = h
        .indexer
        .ingest_text("Lesson 1: No header\nSome text.")
        .await
        .expect_err("missing title");

    assert!(matches!(err, RagError::DocumentParse(_)));
    assert_eq!(h.catalog.count().await.expect("should count"), 0);
    assert_eq!(h.content.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn reingesting_replaces_previous_chunks() {
    let h = harness(ChunkingConfig {
        chunk_size: 60,
        chunk_overlap: 0,
    })
    .await;

    let long = "Course Title: Growing Course

Lesson 1: Many
Alpha starts the lesson. Bravo follows alpha. Charlie comes third. Delta is next in line.
";
    let first = h.indexer.ingest_text(long).await.expect("should ingest");
    assert!(first.chunk_count > 1);

    let short = "Course Title: Growing Course

Lesson 1: Few
Only one sentence now.
";
    let second = h.indexer.ingest_text(short).await.expect("should ingest");
    assert_eq!(second.chunk_count, 1);

    assert_eq!(h.catalog.count().await.expect("should count"), 1);
    assert_eq!(h.content.count().await.expect("should count"), 1);

    let filter = SearchFilter::new(Some("Growing Course".to_string()), None);
    let results = h
        .content
        .search("charlie", &filter, 10)
        .await
        .expect("should search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk_index, 0);
    assert!(results[0].content.ends_with("Only one sentence now."));

    let course = h
        .catalog
        .get("Growing Course")
        .await
        .expect("should get")
        .expect("course stored");
    assert_eq!(course.lessons[0].title, "Few");
}

#[tokio::test]
async fn folder_ingestion_continues_past_bad_documents() {
    let h = harness(ChunkingConfig::default()).await;
    let docs = TempDir::new().expect("should create temp dir");
    std::fs::write(docs.path().join("a_mcp.txt"), MCP_COURSE).expect("write");
    std::fs::write(docs.path().join("b_broken.txt"), "no header here").expect("write");
    std::fs::write(docs.path().join("c_k8s.txt"), K8S_COURSE).expect("write");
    std::fs::write(docs.path().join("d_slides.pdf"), "%PDF-1.4").expect("write");
    std::fs::write(docs.path().join("notes.md"), "# ignored").expect("write");
    std::fs::create_dir(docs.path().join("nested.txt")).expect("mkdir");

    let report = h
        .indexer
        .ingest_folder(docs.path(), IngestOptions::default())
        .await
        .expect("folder ingestion should succeed");

    let names: Vec<String> = report
        .documents
        .iter()
        .map(|d| {
            d.path
                .file_name()
                .expect("file name")
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    assert_eq!(
        names,
        vec!["a_mcp.txt", "b_broken.txt", "c_k8s.txt", "d_slides.pdf"]
    );

    assert!(matches!(report.documents[0].outcome, DocumentOutcome::Ingested(_)));
    assert!(matches!(
        report.documents[1].outcome,
        DocumentOutcome::Failed { ref error } if error.contains("Course Title")
    ));
    assert!(matches!(report.documents[2].outcome, DocumentOutcome::Ingested(_)));
    assert_eq!(report.documents[3].outcome, DocumentOutcome::Unsupported);

    assert_eq!(report.ingested().count(), 2);
    assert_eq!(report.failures().count(), 1);
    assert_eq!(report.total_chunks(), 3);

    let analytics = h.indexer.analytics().await.expect("should analyze");
    assert_eq!(
        analytics,
        CourseAnalytics {
            total_courses: 2,
            course_titles: vec!["Advanced Kubernetes".to_string(), "Intro to MCP".to_string()],
            total_chunks: 3,
        }
    );
}

#[tokio::test]
async fn skip_existing_leaves_indexed_courses_alone() {
    let h = harness(ChunkingConfig::default()).await;
    h.indexer
        .ingest_text(MCP_COURSE)
        .await
        .expect("should ingest");

    let docs = TempDir::new().expect("should create temp dir");
    std::fs::write(docs.path().join("mcp.txt"), MCP_COURSE).expect("write");
    std::fs::write(docs.path().join("k8s.txt"), K8S_COURSE).expect("write");

    let report = h
        .indexer
        .ingest_folder(
            docs.path(),
            IngestOptions {
                skip_existing: true,
            },
        )
        .await
        .expect("should ingest folder");

    assert_eq!(
        report.documents[0].outcome,
        DocumentOutcome::Ingested(IngestedCourse {
            title: "Advanced Kubernetes".to_string(),
            lesson_count: 1,
            chunk_count: 1,
        })
    );
    assert_eq!(
        report.documents[1].outcome,
        DocumentOutcome::SkippedExisting {
            title: "Intro to MCP".to_string()
        }
    );
}

#[tokio::test]
async fn ingest_file_rejects_non_text_documents() {
    let h = harness(ChunkingConfig::default()).await;
    let docs = TempDir::new().expect("should create temp dir");
    let pdf = docs.path().join("course.pdf");
    std::fs::write(&pdf, "%PDF-1.4").expect("write");

    let err = h.indexer.ingest_file(&pdf).await.expect_err("pdf rejected");
    assert!(matches!(err, RagError::DocumentParse(_)));

    let txt = docs.path().join("course.TXT");
    std::fs::write(&txt, K8S_COURSE).expect("write");
    let ingested = h.indexer.ingest_file(&txt).await.expect("should ingest");
    assert_eq!(ingested.title, "Advanced Kubernetes");
}

#[tokio::test]
async fn ingest_file_names_the_path_in_parse_errors() {
    let h = harness(ChunkingConfig::default()).await;
    let docs = TempDir::new().expect("should create temp dir");
    let broken = docs.path().join("broken.txt");
    std::fs::write(&broken, "no header").expect("write");

    let err = h.indexer.ingest_file(&broken).await.expect_err("no title");
    assert!(err.to_string().contains("broken.txt"));
}

#[tokio::test]
async fn delete_and_clear_remove_from_both_indices() {
    let h = harness(ChunkingConfig::default()).await;
    h.indexer.ingest_text(MCP_COURSE).await.expect("should ingest");
    h.indexer.ingest_text(K8S_COURSE).await.expect("should ingest");

    h.indexer
        .delete_course("Intro to MCP")
        .await
        .expect("should delete");
    let analytics = h.indexer.analytics().await.expect("should analyze");
    assert_eq!(analytics.course_titles, vec!["Advanced Kubernetes"]);
    assert_eq!(analytics.total_chunks, 1);

    h.indexer.clear().await.expect("should clear");
    assert_eq!(
        h.indexer.analytics().await.expect("should analyze"),
        CourseAnalytics::default()
    );
}
