//! Tool dispatch errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Invalid tool parameters for {tool}: {message}")]
    InvalidToolParameters { tool: String, message: String },

    #[error("Tool execution failed for {tool}: {message}")]
    ToolExecutionFailed { tool: String, message: String },
}

impl ToolError {
    #[inline]
    pub fn invalid_parameters(tool: &str, message: impl Into<String>) -> Self {
        Self::InvalidToolParameters {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    #[inline]
    pub fn execution_failed(tool: &str, message: impl Into<String>) -> Self {
        Self::ToolExecutionFailed {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// Whether the caller sent bad input, as opposed to the tool failing
    #[inline]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound { .. } | Self::InvalidToolParameters { .. }
        )
    }
}
