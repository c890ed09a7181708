// ABOUTME: Defines the Tool trait - a named capability the model may call,
// ABOUTME: declared with explicit parameter specs and an async call method.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{ParamSpec, ToolOutput};

/// Named arguments for a tool call, as decoded from the model's JSON.
pub type Arguments = Map<String, Value>;

/// A tool that can be dispatched by the registry.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique name of this tool.
    fn name(&self) -> &str;

    /// Returns the documentation shown to the model. Only the first
    /// paragraph is used as the summary.
    fn description(&self) -> &str;

    /// Returns the parameter declarations, in presentation order.
    fn params(&self) -> Vec<ParamSpec>;

    /// Execute the tool with the given named arguments.
    async fn call(&self, args: Arguments) -> Result<ToolOutput, anyhow::Error>;
}
