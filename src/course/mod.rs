// Course data model
// Courses, their lessons and the chunks produced from lesson text

#[cfg(test)]
mod tests;

pub mod parser;

use serde::{Deserialize, Serialize};

pub use parser::parse_course_document;

/// A course as stored in the catalog. The title is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub course_link: Option<String>,
    pub instructor: Option<String>,
    /// Lessons in document order
    pub lessons: Vec<Lesson>,
}

/// Lesson metadata. Content lives in chunks that reference the lesson number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_number: u32,
    pub title: String,
    pub lesson_link: Option<String>,
}

/// Raw text of one lesson, handed to the chunker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonText {
    /// `None` for text that precedes the first lesson marker
    pub lesson_number: Option<u32>,
    pub text: String,
}

/// A parsed course document: catalog metadata plus the text of each lesson
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDocument {
    pub course: Course,
    pub sections: Vec<LessonText>,
}

/// A labeled unit of course text, stored and searched as one embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    /// Zero-based, contiguous within a course across all of its lessons
    pub chunk_index: u32,
    /// Chunk text, already prefixed with its course/lesson label
    pub content: String,
}

impl Course {
    #[inline]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            course_link: None,
            instructor: None,
            lessons: Vec::new(),
        }
    }

    #[inline]
    pub fn lesson(&self, lesson_number: u32) -> Option<&Lesson> {
        self.lessons
            .iter()
            .find(|lesson| lesson.lesson_number == lesson_number)
    }

    /// Link for a lesson, falling back to the course link
    #[inline]
    pub fn link_for(&self, lesson_number: Option<u32>) -> Option<&str> {
        lesson_number
            .and_then(|n| self.lesson(n))
            .and_then(|lesson| lesson.lesson_link.as_deref())
            .or(self.course_link.as_deref())
    }
}

impl Chunk {
    /// Storage address of this chunk in the content index
    #[inline]
    pub fn address(&self) -> String {
        chunk_address(&self.course_title, self.chunk_index)
    }
}

/// Composite key `"{course_title}_{chunk_index}"`
#[inline]
pub fn chunk_address(course_title: &str, chunk_index: u32) -> String {
    format!("{}_{}", course_title, chunk_index)
}
