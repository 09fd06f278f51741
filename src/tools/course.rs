//! Course search and outline tools backed by the retrieval coordinator

use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::error;

use super::{SearchTool, ToolDefinition, ToolError, ToolOutput};
use crate::RagError;
use crate::course::Course;
use crate::retrieval::{Retrieval, RetrievalCoordinator, RetrievalRequest, Source, SourceKind};

pub const SEARCH_TOOL_NAME: &str = "search_course_content";
pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

/// `search_course_content`: filtered content search
pub struct CourseSearchTool {
    coordinator: Arc<RetrievalCoordinator>,
}

/// `get_course_outline`: course metadata and lesson list
pub struct CourseOutlineTool {
    coordinator: Arc<RetrievalCoordinator>,
}

impl CourseSearchTool {
    #[inline]
    pub fn new(coordinator: Arc<RetrievalCoordinator>) -> Self {
        Self { coordinator }
    }
}

impl CourseOutlineTool {
    #[inline]
    pub fn new(coordinator: Arc<RetrievalCoordinator>) -> Self {
        Self { coordinator }
    }
}

fn optional_string(tool: &str, arguments: &Value, key: &str) -> Result<Option<String>, ToolError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ToolError::invalid_parameters(
            tool,
            format!("'{}' must be a string, got {}", key, other),
        )),
    }
}

fn required_string(tool: &str, arguments: &Value, key: &str) -> Result<String, ToolError> {
    optional_string(tool, arguments, key)?.ok_or_else(|| {
        ToolError::invalid_parameters(tool, format!("Missing required parameter: {}", key))
    })
}

fn optional_lesson(tool: &str, arguments: &Value) -> Result<Option<u32>, ToolError> {
    match arguments.get("lesson_number") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                ToolError::invalid_parameters(
                    tool,
                    format!("'lesson_number' must be a non-negative integer, got {}", value),
                )
            }),
    }
}

/// `"[{course} - Lesson {n}]\n{content}"` blocks separated by blank lines
pub fn format_results(retrieval: &Retrieval) -> String {
    retrieval
        .results
        .iter()
        .map(|result| {
            let header = match result.lesson_number {
                Some(n) => format!("[{} - Lesson {}]", result.course_title, n),
                None => format!("[{}]", result.course_title),
            };
            format!("{}\n{}", header, result.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Message for a search that matched nothing, naming the filters that were given
pub fn no_results_message(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
    let mut message = "No relevant content found".to_string();
    if let Some(course) = course_name {
        let _ = write!(message, " in course '{}'", course);
    }
    if let Some(n) = lesson_number {
        let _ = write!(message, " in lesson {}", n);
    }
    message.push('.');
    message
}

pub fn format_outline(course: &Course) -> String {
    let mut lines = vec![format!("Course: {}", course.title)];
    if let Some(link) = &course.course_link {
        lines.push(format!("Course Link: {}", link));
    }
    if let Some(instructor) = &course.instructor {
        lines.push(format!("Instructor: {}", instructor));
    }
    lines.push(format!("Total Lessons: {}", course.lessons.len()));
    lines.push(String::new());
    lines.push("Lesson Structure:".to_string());
    lines.extend(
        course
            .lessons
            .iter()
            .map(|lesson| format!("  Lesson {}: {}", lesson.lesson_number, lesson.title)),
    );
    lines.join("\n")
}

#[async_trait]
impl SearchTool for CourseSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: SEARCH_TOOL_NAME.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let query = required_string(SEARCH_TOOL_NAME, &arguments, "query")?;
        let course_name = optional_string(SEARCH_TOOL_NAME, &arguments, "course_name")?;
        let lesson_number = optional_lesson(SEARCH_TOOL_NAME, &arguments)?;

        let request = RetrievalRequest {
            query,
            course_name: course_name.clone(),
            lesson_number,
            limit: None,
        };

        match self.coordinator.retrieve(&request).await {
            Ok(retrieval) if retrieval.is_empty() => Ok(ToolOutput::text(
                no_results_message(course_name.as_deref(), lesson_number),
                Vec::new(),
            )),
            Ok(retrieval) => Ok(ToolOutput::text(
                format_results(&retrieval),
                retrieval.sources,
            )),
            Err(RagError::NoCoursesIndexed) => Ok(ToolOutput::error(format!(
                "No course found matching '{}': no courses have been indexed yet.",
                course_name.unwrap_or_default()
            ))),
            Err(RagError::InvalidQuery(message)) => {
                Err(ToolError::invalid_parameters(SEARCH_TOOL_NAME, message))
            }
            Err(e) => {
                error!("Course search failed: {}", e);
                Err(ToolError::execution_failed(SEARCH_TOOL_NAME, e.to_string()))
            }
        }
    }
}

#[async_trait]
impl SearchTool for CourseOutlineTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: OUTLINE_TOOL_NAME.to_string(),
            description: "Retrieve the complete structure and lesson list for a specific course. Use this for questions about course topics, lesson structure or course overviews, not for searching lesson content."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title or partial name (e.g. 'MCP', 'Introduction to Python'). Fuzzy matching is supported."
                    }
                },
                "required": ["course_name"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let course_name = required_string(OUTLINE_TOOL_NAME, &arguments, "course_name")?;

        match self.coordinator.outline(&course_name).await {
            Ok(course) => {
                let source = Source {
                    label: course.title.clone(),
                    link: course.course_link.clone(),
                    kind: SourceKind::Course,
                };
                Ok(ToolOutput::text(format_outline(&course), vec![source]))
            }
            Err(RagError::NoCoursesIndexed) => Ok(ToolOutput::error(format!(
                "No course found matching '{}'. No courses have been indexed yet.",
                course_name
            ))),
            Err(RagError::InvalidQuery(message)) => {
                Err(ToolError::invalid_parameters(OUTLINE_TOOL_NAME, message))
            }
            Err(e) => {
                error!("Course outline failed: {}", e);
                Err(ToolError::execution_failed(OUTLINE_TOOL_NAME, e.to_string()))
            }
        }
    }
}
