// ABOUTME: Orchestrator - runs the call-model / dispatch-tool loop for one
// ABOUTME: user turn, bounded by a retry budget, streaming or not.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::{Conversation, ConversationStatus};
use crate::config::Config;
use crate::error::ConversationError;
use crate::llm::{
    Completion, FunctionCall, LlmClient, Message, Request, collect_stream,
    DEFAULT_MODEL,
};
use crate::tool::{Arguments, ToolRegistry};

/// Tool round-trips allowed per turn unless configured otherwise.
pub const DEFAULT_MAX_RETRIES: usize = 5;

type DeltaCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Drives conversations against one completion endpoint and tool registry.
///
/// An orchestrator holds no per-conversation state, so one instance can
/// serve any number of concurrent [`run`](Self::run) calls.
#[derive(Clone)]
pub struct Orchestrator {
    client: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    model: String,
    max_retries: usize,
    streaming: bool,
    on_delta: Option<DeltaCallback>,
}

impl Orchestrator {
    /// Create an orchestrator with the default model and retry budget.
    pub fn new(client: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            client,
            registry,
            model: DEFAULT_MODEL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            streaming: false,
            on_delta: None,
        }
    }

    /// Create an orchestrator using the model, budget and mode from `config`.
    pub fn from_config(
        config: &Config,
        client: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        Self::new(client, registry)
            .model(&config.llm_model)
            .max_retries(config.max_retries)
            .streaming(config.stream)
    }

    /// Set the model identifier sent with each request.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set how many tool round-trips one turn may make.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Request streamed completions.
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Receive streamed text fragments as they arrive.
    pub fn on_delta(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_delta = Some(Arc::new(callback));
        self
    }

    /// The registry consulted for tool specs and dispatch.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run one user turn on top of `history` (which may be empty).
    ///
    /// Returns the extended history once the model replies or the retry
    /// budget runs out. Malformed function-call arguments and transport
    /// failures end the turn with an error.
    pub async fn run(
        &self,
        query: &str,
        history: Vec<Message>,
    ) -> Result<Conversation, ConversationError> {
        let span = tracing::info_span!(
            "conversation",
            id = %Uuid::new_v4(),
            model = %self.model,
            streaming = self.streaming
        );
        self.run_loop(query, history).instrument(span).await
    }

    async fn run_loop(
        &self,
        query: &str,
        history: Vec<Message>,
    ) -> Result<Conversation, ConversationError> {
        let mut messages = history;
        messages.push(Message::user(query));
        let functions = self.registry.specs();
        let mut tool_calls = 0;

        loop {
            let request = Request::new(&self.model)
                .messages(messages.iter().cloned())
                .functions(functions.iter().cloned());

            match self.complete(&request).await? {
                Completion::Reply(text) => {
                    tracing::info!(reply = %text, "final reply");
                    messages.push(Message::assistant(text));
                    return Ok(Conversation {
                        messages,
                        status: ConversationStatus::Completed,
                        tool_calls,
                    });
                }
                Completion::FunctionCall { content, call } => {
                    tracing::info!(
                        function = %call.name,
                        arguments = %call.arguments,
                        "function call response"
                    );

                    if tool_calls >= self.max_retries {
                        tracing::warn!(
                            max_retries = self.max_retries,
                            function = %call.name,
                            "retry budget exhausted; call not dispatched"
                        );
                        return Ok(Conversation {
                            messages,
                            status: ConversationStatus::RetryExhausted,
                            tool_calls,
                        });
                    }

                    let args = parse_arguments(&call)?;
                    let result = self.registry.dispatch(&call.name, args).await;
                    tool_calls += 1;

                    let name = call.name.clone();
                    messages.push(Message::function_call(content, call));
                    messages.push(Message::function_result(name, result));
                }
            }
        }
    }

    async fn complete(&self, request: &Request) -> Result<Completion, ConversationError> {
        if !self.streaming {
            let response = self.client.create_message(request).await?;
            return Ok(Completion::from(response));
        }

        let stream = self.client.create_message_stream(request);
        let completion = collect_stream(stream, |text| {
            if let Some(callback) = &self.on_delta {
                callback(text);
            }
        })
        .await?;
        Ok(completion)
    }
}

/// Decode a function call's arguments into a named-argument map.
pub fn parse_arguments(call: &FunctionCall) -> Result<Arguments, ConversationError> {
    serde_json::from_str(&call.arguments).map_err(|source| ConversationError::ArgumentParse {
        name: call.name.clone(),
        arguments: call.arguments.clone(),
        source,
    })
}
