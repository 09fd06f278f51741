use super::*;
use crate::config::EmbeddingBackend;
use crate::database::CatalogIndex;
use crate::retrieval::RetrievalRequest;
use tempfile::TempDir;

fn hashing_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::load(temp_dir.path()).expect("should load defaults");
    config.embedding.provider = EmbeddingBackend::Hashing;
    config.embedding.dimension = 256;
    config
}

#[tokio::test]
async fn open_with_hashing_provider_creates_stores() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let app = App::open(hashing_config(&temp_dir))
        .await
        .expect("should open app");

    assert!(temp_dir.path().join("vectors").exists());
    assert_eq!(app.catalog().count().await.expect("should count"), 0);
    assert_eq!(app.config().search.max_results, 5);
}

#[tokio::test]
async fn open_rejects_invalid_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = hashing_config(&temp_dir);
    config.chunking.chunk_overlap = config.chunking.chunk_size;

    let err = App::open(config).await.err().expect("invalid config");
    assert!(matches!(err, RagError::Config(_)));
}

#[tokio::test]
async fn ingest_then_retrieve_through_app() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let app = App::open(hashing_config(&temp_dir))
        .await
        .expect("should open app");

    app.indexer()
        .ingest_text("Course Title: Rust Basics\n\nLesson 1: Ownership\nEvery value has one owner.")
        .await
        .expect("should ingest");

    let retrieval = app
        .coordinator()
        .retrieve(&RetrievalRequest::new("who owns a value").with_course("rust"))
        .await
        .expect("should retrieve");

    assert_eq!(retrieval.resolved_course.as_deref(), Some("Rust Basics"));
    assert_eq!(retrieval.results.len(), 1);
    assert_eq!(retrieval.sources[0].label, "Rust Basics - Lesson 1");
}

#[tokio::test]
async fn tool_registries_have_independent_source_slots() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let app = App::open(hashing_config(&temp_dir))
        .await
        .expect("should open app");
    app.indexer()
        .ingest_text("Course Title: Rust Basics\n\nLesson 1: Ownership\nEvery value has one owner.")
        .await
        .expect("should ingest");

    let first = app.tool_registry();
    let second = app.tool_registry();

    first
        .execute(
            "search_course_content",
            serde_json::json!({ "query": "owner" }),
        )
        .await
        .expect("should search");

    assert_eq!(first.last_sources().len(), 1);
    assert!(second.last_sources().is_empty());
}
