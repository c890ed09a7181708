// ABOUTME: Core types for completion endpoint communication - messages,
// ABOUTME: function calls, requests, responses, and streaming chunks.

use serde::{Deserialize, Serialize};

use crate::tool::ToolSpec;

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Carries a tool's textual result back to the model.
    #[serde(alias = "tool")]
    Function,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    FunctionCall,
    Length,
}

impl FinishReason {
    /// Parse a wire finish reason. Unknown values map to `Stop`.
    pub fn parse(s: &str) -> Self {
        match s {
            "function_call" | "tool_calls" => Self::FunctionCall,
            "length" => Self::Length,
            _ => Self::Stop,
        }
    }
}

/// A structured request from the model to run a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, exactly as the model produced it.
    pub arguments: String,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// Function name, set only on function-result messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            function_call: None,
            name: None,
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_role(Role::System, text)
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(Role::User, text)
    }

    /// Create an assistant message with text content.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, text)
    }

    /// Create an assistant message requesting a function call.
    ///
    /// Empty `content` is stored as `None`.
    pub fn function_call(content: impl Into<String>, call: FunctionCall) -> Self {
        let content = content.into();
        Self {
            role: Role::Assistant,
            content: if content.is_empty() { None } else { Some(content) },
            function_call: Some(call),
            name: None,
        }
    }

    /// Create a function-role message carrying a tool result.
    pub fn function_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Function,
            content: Some(content.into()),
            function_call: None,
            name: Some(name.into()),
        }
    }

    /// The text content, or an empty string.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Request to create a completion.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub model: String,
    pub messages: Vec<Message>,
    pub functions: Vec<ToolSpec>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl Request {
    /// Create a new request with the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Add a message to the request.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Add messages to the request.
    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Add function definitions.
    pub fn functions(mut self, functions: impl IntoIterator<Item = ToolSpec>) -> Self {
        self.functions.extend(functions);
        self
    }

    /// Set max tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A non-streaming completion.
#[derive(Debug, Clone)]
pub struct Response {
    pub id: String,
    pub model: String,
    pub message: Message,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl Response {
    /// The function call carried by the reply, if any.
    pub fn function_call(&self) -> Option<&FunctionCall> {
        self.message.function_call.as_ref()
    }
}

/// What the model produced for one turn, independent of transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// A final natural-language reply.
    Reply(String),
    /// A request to run a tool, with any text produced alongside it.
    FunctionCall { content: String, call: FunctionCall },
}

impl Completion {
    /// The assistant message to append to the history for this completion.
    pub fn into_message(self) -> Message {
        match self {
            Self::Reply(text) => Message::assistant(text),
            Self::FunctionCall { content, call } => Message::function_call(content, call),
        }
    }
}

impl From<Response> for Completion {
    fn from(resp: Response) -> Self {
        let Message {
            content,
            function_call,
            ..
        } = resp.message;
        let content = content.unwrap_or_default();
        match function_call {
            Some(call) => Self::FunctionCall { content, call },
            None => Self::Reply(content),
        }
    }
}

/// One incremental piece of a streamed completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatChunk {
    /// New text to append to the reply.
    pub content: Option<String>,
    /// Function call fragment: the name (when known) and the argument text
    /// carried by this chunk.
    pub function_call: Option<FunctionCallDelta>,
    pub finish_reason: Option<FinishReason>,
}

impl ChatChunk {
    /// A chunk carrying only text.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// A terminal chunk with the given finish reason.
    pub fn finish(reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Default::default()
        }
    }
}

/// Partial function call data from a single chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionCallDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}
