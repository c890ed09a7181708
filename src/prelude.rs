// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use hydro_agent::prelude::*;` to get started quickly.

pub use crate::config::Config;
pub use crate::conversation::{APOLOGY, Conversation, ConversationStatus, Orchestrator};
pub use crate::error::{ConfigError, ConversationError, HydroError, LlmError, RegistrationError};
pub use crate::llm::{
    ChatChunk, Completion, FinishReason, FunctionCall, LlmClient, Message, OpenAIClient, Request,
    Response, Role,
};
pub use crate::tool::{Arguments, ParamSpec, Tool, ToolOutput, ToolRegistry, ToolSpec};
pub use crate::tools::{HydroApi, RainTool, ReservoirTool, StationsTool, hydro_registry};
