
use std::sync::LazyLock;

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::course::{Chunk, LessonText};

/// Sentence boundary: whitespace after `.`, `!` or `?` that is followed by an
/// uppercase letter. Periods inside initials ("U.S. Army") and short
/// abbreviations ("Dr. Smith") do not end a sentence.
static SENTENCE_BOUNDARY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?<!\w\.\w.)(?<![A-Z][a-z]\.)(?<=\.|\!|\?)\s+(?=[A-Z])").expect("valid regex")
});

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Configuration for content chunking. Sizes are measured in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Soft upper bound on chunk length; a single longer sentence is kept whole
    pub chunk_size: usize,
    /// Trailing characters of a chunk carried into the next one, in whole sentences
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

/// Chunk every lesson of a course into labeled, overlapping chunks.
///
/// `chunk_index` runs from 0 across all lessons of the course, in lesson order.
#[inline]
pub fn chunk_course(
    course_title: &str,
    lessons: &[LessonText],
    config: &ChunkingConfig,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut chunk_index: u32 = 0;

    for lesson in lessons {
        for segment in split_into_segments(&lesson.text, config) {
            chunks.push(Chunk {
                course_title: course_title.to_string(),
                lesson_number: lesson.lesson_number,
                chunk_index,
                content: format!(
                    "{} {}",
                    context_label(course_title, lesson.lesson_number),
                    segment
                ),
            });
            chunk_index += 1;
        }
    }

    debug!(
        "Chunked course '{}' into {} chunks across {} lessons",
        course_title,
        chunks.len(),
        lessons.len()
    );

    chunks
}

/// Label that makes a chunk self-describing once separated from its metadata
#[inline]
pub fn context_label(course_title: &str, lesson_number: Option<u32>) -> String {
    match lesson_number {
        Some(n) => format!("Course {} Lesson {} content:", course_title, n),
        None => format!("Course {} content:", course_title),
    }
}

/// Split raw lesson text into unlabeled, overlapping segments of whole sentences
#[inline]
pub fn split_into_segments(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    let sentences = split_sentences(&normalized);

    let mut segments = Vec::new();
    let mut start = 0;

    while start < sentences.len() {
        let mut current: Vec<&str> = Vec::new();
        let mut current_size = 0;

        for sentence in &sentences[start..] {
            let addition = char_len(sentence) + usize::from(!current.is_empty());
            if current_size + addition > config.chunk_size && !current.is_empty() {
                break;
            }
            current.push(sentence);
            current_size += addition;
        }

        segments.push(current.join(" "));

        if start + current.len() >= sentences.len() {
            break;
        }

        let overlap_sentences = overlap_sentence_count(&current, config.chunk_overlap);
        let next_start = start + current.len() - overlap_sentences;
        start = next_start.max(start + 1);
    }

    segments
}

/// Number of trailing sentences of `chunk` that fit in `overlap` characters
fn overlap_sentence_count(chunk: &[&str], overlap: usize) -> usize {
    let mut overlap_size = 0;
    let mut count = 0;

    for (position, sentence) in chunk.iter().enumerate().rev() {
        let sentence_len = char_len(sentence) + usize::from(position + 1 < chunk.len());
        if overlap_size + sentence_len > overlap {
            break;
        }
        overlap_size += sentence_len;
        count += 1;
    }

    count
}

/// Split normalized text into trimmed, non-empty sentences
#[inline]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last_end = 0;

    for boundary in SENTENCE_BOUNDARY_REGEX.find_iter(text).flatten() {
        push_sentence(&mut sentences, &text[last_end..boundary.start()]);
        last_end = boundary.end();
    }
    push_sentence(&mut sentences, &text[last_end..]);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text.trim(), " ").into_owned()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
