//! Tool execution types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool name that was executed
    pub tool: String,

    /// Textual output handed back to the orchestration layer
    pub output: String,

    /// Whether the invocation produced usable output
    pub success: bool,

    /// Execution duration in milliseconds
    pub duration_ms: u64,

    /// Error message when the invocation failed
    pub error: Option<String>,
}

impl ToolResult {
    /// Create successful result
    pub fn success(tool: String, output: String, duration: Duration) -> Self {
        Self {
            tool,
            output,
            success: true,
            duration_ms: duration.as_millis() as u64,
            error: None,
        }
    }

    /// Create failed result
    pub fn failure(tool: String, error: String, duration: Duration) -> Self {
        Self {
            tool,
            output: String::new(),
            success: false,
            duration_ms: duration.as_millis() as u64,
            error: Some(error),
        }
    }
}

/// Tool schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name
    pub name: String,

    /// Tool description
    pub description: String,

    /// Parameter schema (JSON Schema)
    pub parameters: serde_json::Value,
}

impl ToolSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}
