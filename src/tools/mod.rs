//! Model-facing tools
//!
//! Each tool takes structured JSON arguments and returns text for the model
//! plus the sources behind it. The registry dispatches by tool name and keeps
//! the sources of its most recent execution for the caller to display.


pub mod course;
pub mod errors;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use crate::retrieval::Source;

pub use course::{CourseOutlineTool, CourseSearchTool};
pub use errors::ToolError;

/// Name, description and JSON schema advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Result of one tool execution
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolOutput {
    pub text: String,
    pub sources: Vec<Source>,
    /// The text explains a failure the model should see rather than content
    pub is_error: bool,
}

impl ToolOutput {
    #[inline]
    pub fn text(text: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            text: text.into(),
            sources,
            is_error: false,
        }
    }

    #[inline]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
            is_error: true,
        }
    }
}

#[async_trait]
pub trait SearchTool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError>;
}

/// Tools keyed by name, plus a single last-sources slot.
///
/// The slot is per registry; give each conversation its own registry.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn SearchTool>>,
    last_sources: Mutex<Vec<Source>>,
}

impl ToolRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its definition's name, replacing any tool with
    /// the same name
    #[inline]
    pub fn register(&mut self, tool: Arc<dyn SearchTool>) {
        let name = tool.definition().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("Replaced previously registered tool: {}", name);
        }
    }

    /// Definitions of every registered tool, sorted by name
    #[inline]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|tool| tool.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Run the named tool. A returned output overwrites the last-sources slot.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::ToolNotFound {
                name: name.to_string(),
            })?;

        debug!("Executing tool {} with arguments {}", name, arguments);
        let output = tool.execute(arguments).await?;

        *self
            .last_sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = output.sources.clone();

        Ok(output)
    }

    /// Sources of the most recent execution, in result order
    #[inline]
    pub fn last_sources(&self) -> Vec<Source> {
        self.last_sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[inline]
    pub fn reset_sources(&self) {
        self.last_sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
