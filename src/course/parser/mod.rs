
use std::collections::HashSet;
use std::sync::LazyLock;

use fancy_regex::Regex;
use tracing::debug;

use super::{Course, CourseDocument, Lesson, LessonText};
use crate::{RagError, Result};

static HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^course\s+(title|link|instructor)\s*:\s*(.*)$").expect("valid regex")
});

static LESSON_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^lesson\s+(\d+)\s*:\s*(.*)$").expect("valid regex"));

static LESSON_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^lesson\s+link\s*:\s*(.*)$").expect("valid regex"));

/// Lesson currently being collected
struct PendingSection {
    lesson: Option<Lesson>,
    lines: Vec<String>,
    awaiting_link: bool,
}

impl PendingSection {
    fn preamble() -> Self {
        Self {
            lesson: None,
            lines: Vec::new(),
            awaiting_link: false,
        }
    }

    fn lesson(lesson_number: u32, title: String) -> Self {
        Self {
            lesson: Some(Lesson {
                lesson_number,
                title,
                lesson_link: None,
            }),
            lines: Vec::new(),
            awaiting_link: true,
        }
    }
}

/// Parse a plain-text course document.
///
/// The document starts with `Course Title:` / `Course Link:` / `Course Instructor:`
/// header lines, followed by lessons introduced by `Lesson <n>: <title>` markers.
/// A `Lesson Link:` line directly after a marker sets that lesson's link.
#[inline]
pub fn parse_course_document(text: &str) -> Result<CourseDocument> {
    let mut title = None;
    let mut course_link = None;
    let mut instructor = None;

    let mut lines = text.lines().peekable();

    // Header block: blank lines and `Course <key>:` lines only
    while let Some(line) = lines.peek() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            lines.next();
            continue;
        }

        let Some(captures) = HEADER_REGEX.captures(trimmed).ok().flatten() else {
            break;
        };

        let key = captures
            .get(1)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        let value = captures
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .filter(|v| !v.is_empty());

        match key.as_str() {
            "title" => title = value,
            "link" => course_link = value,
            "instructor" => instructor = value,
            _ => {}
        }
        lines.next();
    }

    let title = title.ok_or_else(|| {
        RagError::DocumentParse("missing or empty 'Course Title:' header".to_string())
    })?;

    let mut course = Course {
        title,
        course_link,
        instructor,
        lessons: Vec::new(),
    };
    let mut sections = Vec::new();
    let mut seen_lessons = HashSet::new();
    let mut pending = PendingSection::preamble();

    for line in lines {
        let trimmed = line.trim();

        if let Some(captures) = LESSON_MARKER_REGEX.captures(trimmed).ok().flatten() {
            let number_text = captures.get(1).map_or("", |m| m.as_str());
            let lesson_number: u32 = number_text.parse().map_err(|_| {
                RagError::DocumentParse(format!("invalid lesson number '{}'", number_text))
            })?;

            if !seen_lessons.insert(lesson_number) {
                return Err(RagError::DocumentParse(format!(
                    "lesson {} appears more than once in '{}'",
                    lesson_number, course.title
                )));
            }

            let lesson_title = captures
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| format!("Lesson {}", lesson_number));

            finish_section(pending, &mut course, &mut sections);
            pending = PendingSection::lesson(lesson_number, lesson_title);
            continue;
        }

        if pending.awaiting_link {
            if trimmed.is_empty() {
                continue;
            }
            pending.awaiting_link = false;

            if let Some(captures) = LESSON_LINK_REGEX.captures(trimmed).ok().flatten() {
                if let Some(lesson) = pending.lesson.as_mut() {
                    lesson.lesson_link = captures
                        .get(1)
                        .map(|m| m.as_str().trim().to_string())
                        .filter(|l| !l.is_empty());
                }
                continue;
            }
        }

        pending.lines.push(line.to_string());
    }
    finish_section(pending, &mut course, &mut sections);

    debug!(
        "Parsed course '{}': {} lessons, {} text sections",
        course.title,
        course.lessons.len(),
        sections.len()
    );

    Ok(CourseDocument { course, sections })
}

fn finish_section(
    pending: PendingSection,
    course: &mut Course,
    sections: &mut Vec<LessonText>,
) {
    let text = pending.lines.join("\n").trim().to_string();

    match pending.lesson {
        Some(lesson) => {
            sections.push(LessonText {
                lesson_number: Some(lesson.lesson_number),
                text,
            });
            course.lessons.push(lesson);
        }
        None if !text.is_empty() => sections.push(LessonText {
            lesson_number: None,
            text,
        }),
        None => {}
    }
}
