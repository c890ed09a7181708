// ABOUTME: Defines all error types for hydro-agent using thiserror.
// ABOUTME: Each concern has its own error enum, unified under HydroError.

/// Top-level error type for the hydro-agent library.
#[derive(Debug, thiserror::Error)]
pub enum HydroError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from completion endpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stream closed before a finish reason was received")]
    StreamClosed,

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Response contained no choices")]
    EmptyResponse,
}

/// A tool definition was rejected at registration time.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Tool `{tool}` has no description")]
    MissingDescription { tool: String },

    #[error("Tool `{tool}` has a parameter with an empty name")]
    EmptyParamName { tool: String },

    #[error("Parameter `{param}` of tool `{tool}` is declared more than once")]
    DuplicateParam { tool: String, param: String },

    #[error("Parameter `{param}` of tool `{tool}` is missing a type tag")]
    MissingType { tool: String, param: String },

    #[error("Parameter `{param}` of tool `{tool}` is missing a description")]
    MissingParamDescription { tool: String, param: String },

    #[error("Parameter `{param}` of tool `{tool}` has unrecognized type `{type_tag}`")]
    UnknownType {
        tool: String,
        param: String,
        type_tag: String,
    },
}

/// Errors that end a conversation turn.
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Malformed arguments for `{name}`: {source} (raw: {arguments})")]
    ArgumentParse {
        name: String,
        arguments: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
