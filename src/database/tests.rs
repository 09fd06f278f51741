use super::*;

fn result(course_title: &str, chunk_index: u32, distance: f32) -> SearchResult {
    SearchResult {
        content: format!("chunk {chunk_index}"),
        course_title: course_title.to_string(),
        lesson_number: None,
        chunk_index,
        distance,
    }
}

#[test]
fn empty_filter_has_no_predicate() {
    let filter = SearchFilter::default();
    assert!(filter.is_empty());
    assert_eq!(filter.predicate(), None);
}

#[test]
fn filter_predicates_are_anded() {
    let course_only = SearchFilter::new(Some("Intro to MCP".to_string()), None);
    assert_eq!(
        course_only.predicate().as_deref(),
        Some("course_title = 'Intro to MCP'")
    );

    let lesson_only = SearchFilter::new(None, Some(2));
    assert_eq!(lesson_only.predicate().as_deref(), Some("lesson_number = 2"));

    let both = SearchFilter::new(Some("Intro to MCP".to_string()), Some(2));
    assert_eq!(
        both.predicate().as_deref(),
        Some("course_title = 'Intro to MCP' AND lesson_number = 2")
    );
}

#[test]
fn quote_literal_doubles_single_quotes() {
    assert_eq!(quote_literal("plain"), "'plain'");
    assert_eq!(quote_literal("Bob's Course"), "'Bob''s Course'");
    assert_eq!(quote_literal("' OR 1=1 --"), "''' OR 1=1 --'");
}

#[test]
fn sort_breaks_distance_ties_by_chunk_index() {
    let mut results = vec![
        result("B", 7, 0.25),
        result("A", 3, 0.5),
        result("A", 4, 0.25),
        result("A", 1, 0.25),
        result("A", 0, 0.75),
    ];

    sort_results(&mut results);

    let order: Vec<(u32, f32)> = results
        .iter()
        .map(|r| (r.chunk_index, r.distance))
        .collect();
    assert_eq!(
        order,
        vec![(1, 0.25), (4, 0.25), (7, 0.25), (3, 0.5), (0, 0.75)]
    );
}

#[test]
fn sort_uses_course_title_as_last_resort() {
    let mut results = vec![result("Zeta", 2, 0.1), result("Alpha", 2, 0.1)];

    sort_results(&mut results);

    assert_eq!(results[0].course_title, "Alpha");
    assert_eq!(results[1].course_title, "Zeta");
}
