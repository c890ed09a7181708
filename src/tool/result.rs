// ABOUTME: Defines ToolOutput - what a tool hands back on success, either
// ABOUTME: plain text or a JSON value, rendered as text for the model.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Successful output of a tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Plain text, passed through unchanged.
    Text(String),
    /// Structured data, rendered as compact JSON.
    Json(Value),
}

impl ToolOutput {
    /// Create a text output.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Create a JSON output from any serializable value.
    pub fn json(value: impl Serialize) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Json)
    }

    /// The text handed back to the model.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(Value::String(text)) => text,
            Self::Json(value) => value.to_string(),
        }
    }
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) | Self::Json(Value::String(text)) => f.write_str(text),
            Self::Json(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl Default for ToolOutput {
    fn default() -> Self {
        Self::text("")
    }
}
