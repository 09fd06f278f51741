use super::*;
use crate::embeddings::HashingEmbedder;
use tempfile::TempDir;

async fn open_catalog(temp_dir: &TempDir, dimension: usize) -> LanceCatalogIndex {
    let database = VectorDatabase::open(&temp_dir.path().join("vectors"))
        .await
        .expect("should open vector database");
    LanceCatalogIndex::open(database, Arc::new(HashingEmbedder::new(dimension)))
        .await
        .expect("should open catalog index")
}

fn course(title: &str) -> Course {
    Course {
        title: title.to_string(),
        course_link: Some(format!("https://example.com/{}", title.len())),
        instructor: Some("Ada Lovelace".to_string()),
        lessons: vec![
            Lesson {
                lesson_number: 0,
                title: "Overview".to_string(),
                lesson_link: Some("https://example.com/lesson-0".to_string()),
            },
            Lesson {
                lesson_number: 1,
                title: "Setup".to_string(),
                lesson_link: None,
            },
        ],
    }
}

#[tokio::test]
async fn empty_catalog_resolves_to_none() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let catalog = open_catalog(&temp_dir, 512).await;

    assert_eq!(catalog.count().await.expect("should count"), 0);
    assert_eq!(catalog.resolve("anything").await.expect("should resolve"), None);
    assert!(catalog.titles().await.expect("should list").is_empty());
}

#[tokio::test]
async fn upsert_then_get_round_trips_course_metadata() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let catalog = open_catalog(&temp_dir, 512).await;
    let original = course("Introduction to MCP");

    catalog.upsert(&original).await.expect("should upsert");

    let stored = catalog
        .get("Introduction to MCP")
        .await
        .expect("should get")
        .expect("course should exist");
    assert_eq!(stored, original);
    assert_eq!(catalog.get("Missing").await.expect("should get"), None);
}

#[tokio::test]
async fn upsert_replaces_entry_with_same_title() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let catalog = open_catalog(&temp_dir, 512).await;

    catalog
        .upsert(&course("Introduction to MCP"))
        .await
        .expect("should upsert");

    let mut updated = Course::new("Introduction to MCP");
    updated.instructor = Some("Grace Hopper".to_string());
    catalog.upsert(&updated).await.expect("should upsert again");

    assert_eq!(catalog.count().await.expect("should count"), 1);
    let stored = catalog
        .get("Introduction to MCP")
        .await
        .expect("should get")
        .expect("course should exist");
    assert_eq!(stored.instructor.as_deref(), Some("Grace Hopper"));
    assert!(stored.lessons.is_empty());
    assert_eq!(stored.course_link, None);
}

#[tokio::test]
async fn resolve_picks_nearest_title_for_partial_name() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let catalog = open_catalog(&temp_dir, 512).await;

    catalog
        .upsert(&course("Introduction to MCP"))
        .await
        .expect("should upsert");
    catalog
        .upsert(&course("Advanced Kubernetes"))
        .await
        .expect("should upsert");

    let resolved = catalog.resolve("MCP").await.expect("should resolve");
    assert_eq!(resolved.as_deref(), Some("Introduction to MCP"));
}

#[tokio::test]
async fn resolve_has_no_similarity_cutoff() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let catalog = open_catalog(&temp_dir, 512).await;

    catalog
        .upsert(&course("Introduction to MCP"))
        .await
        .expect("should upsert");
    catalog
        .upsert(&course("Advanced Kubernetes"))
        .await
        .expect("should upsert");

    let resolved = catalog
        .resolve("Nonexistent Course")
        .await
        .expect("should resolve");
    assert!(resolved.is_some());
}

#[tokio::test]
async fn hints_without_latin_words_still_resolve() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let catalog = open_catalog(&temp_dir, 512).await;
    let titles = ["Introduction to MCP", "Advanced Kubernetes"];
    for title in titles {
        catalog.upsert(&course(title)).await.expect("should upsert");
    }

    for hint in ["日本語", "???"] {
        let resolved = catalog
            .resolve(hint)
            .await
            .expect("should resolve")
            .expect("a non-empty catalog always resolves");
        assert!(titles.contains(&resolved.as_str()), "{} -> {}", hint, resolved);
    }
}

#[tokio::test]
async fn equidistant_titles_resolve_to_smallest_title() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    // One dimension makes every embedding identical
    let catalog = open_catalog(&temp_dir, 1).await;

    let titles = [
        "Rust Basics",
        "Kotlin Basics",
        "Go Basics",
        "Swift Basics",
        "Python Basics",
        "Java Basics",
        "C Basics",
        "Elixir Basics",
    ];
    assert!(titles.len() > RESOLVE_CANDIDATES);
    for title in titles {
        catalog.upsert(&course(title)).await.expect("should upsert");
    }

    let resolved = catalog.resolve("anything").await.expect("should resolve");
    assert_eq!(resolved.as_deref(), Some("C Basics"));
}

#[tokio::test]
async fn titles_are_sorted_and_delete_removes_one() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let catalog = open_catalog(&temp_dir, 512).await;

    for title in ["Zig Basics", "Bob's Course", "Advanced Kubernetes"] {
        catalog.upsert(&course(title)).await.expect("should upsert");
    }

    assert_eq!(
        catalog.titles().await.expect("should list"),
        vec!["Advanced Kubernetes", "Bob's Course", "Zig Basics"]
    );

    catalog.delete("Bob's Course").await.expect("should delete");
    assert_eq!(
        catalog.titles().await.expect("should list"),
        vec!["Advanced Kubernetes", "Zig Basics"]
    );
    assert_eq!(catalog.get("Bob's Course").await.expect("should get"), None);
}

#[tokio::test]
async fn clear_empties_the_catalog() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let catalog = open_catalog(&temp_dir, 512).await;

    catalog
        .upsert(&course("Introduction to MCP"))
        .await
        .expect("should upsert");
    catalog.clear().await.expect("should clear");

    assert_eq!(catalog.count().await.expect("should count"), 0);
    assert_eq!(catalog.resolve("MCP").await.expect("should resolve"), None);

    catalog
        .upsert(&course("Advanced Kubernetes"))
        .await
        .expect("table should be usable after clear");
    assert_eq!(catalog.count().await.expect("should count"), 1);
}

#[tokio::test]
async fn reopening_with_other_dimension_recreates_table() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    {
        let catalog = open_catalog(&temp_dir, 512).await;
        catalog
            .upsert(&course("Introduction to MCP"))
            .await
            .expect("should upsert");
    }

    let catalog = open_catalog(&temp_dir, 64).await;
    assert_eq!(catalog.count().await.expect("should count"), 0);

    catalog
        .upsert(&course("Introduction to MCP"))
        .await
        .expect("should upsert with new dimension");
    assert_eq!(catalog.count().await.expect("should count"), 1);
}

#[tokio::test]
async fn reopening_with_same_dimension_keeps_rows() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    {
        let catalog = open_catalog(&temp_dir, 512).await;
        catalog
            .upsert(&course("Introduction to MCP"))
            .await
            .expect("should upsert");
    }

    let catalog = open_catalog(&temp_dir, 512).await;
    assert_eq!(catalog.count().await.expect("should count"), 1);
}
