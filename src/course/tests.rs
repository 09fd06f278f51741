use super::*;

fn sample_course() -> Course {
    Course {
        title: "Intro to MCP".to_string(),
        course_link: Some("https://example.com/mcp".to_string()),
        instructor: Some("Ada".to_string()),
        lessons: vec![
            Lesson {
                lesson_number: 0,
                title: "Overview".to_string(),
                lesson_link: Some("https://example.com/mcp/0".to_string()),
            },
            Lesson {
                lesson_number: 1,
                title: "Setup".to_string(),
                lesson_link: None,
            },
        ],
    }
}

#[test]
fn chunk_address_format() {
    let chunk = Chunk {
        course_title: "Intro to MCP".to_string(),
        lesson_number: Some(1),
        chunk_index: 1,
        content: "Course Intro to MCP Lesson 1 content: Install the SDK.".to_string(),
    };

    assert_eq!(chunk.address(), "Intro to MCP_1");
    assert_eq!(chunk_address("Intro to MCP", 0), "Intro to MCP_0");
}

#[test]
fn lesson_link_falls_back_to_course_link() {
    let course = sample_course();

    assert_eq!(course.link_for(Some(0)), Some("https://example.com/mcp/0"));
    assert_eq!(course.link_for(Some(1)), Some("https://example.com/mcp"));
    assert_eq!(course.link_for(Some(7)), Some("https://example.com/mcp"));
    assert_eq!(course.link_for(None), Some("https://example.com/mcp"));
}

#[test]
fn course_serialization() {
    let course = sample_course();

    let json = serde_json::to_string(&course).expect("can serialize json");
    let parsed: Course = serde_json::from_str(&json).expect("can parse json");

    assert_eq!(course, parsed);
}
