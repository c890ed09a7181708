// ABOUTME: Scripted LlmClient that replays canned completions in order.
// ABOUTME: Records every request so tests can inspect what the model saw.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::client::{ChunkStream, LlmClient};
use super::{
    ChatChunk, Completion, FinishReason, FunctionCallDelta, Request, Response, Usage,
};
use crate::error::LlmError;

/// A mock client that returns pre-configured completions for testing.
///
/// When the script runs out it repeats the `fallback` completion if one was
/// set, otherwise it answers with an empty reply.
#[derive(Default)]
pub struct MockClient {
    script: Mutex<VecDeque<Result<Completion, (u16, String)>>>,
    fallback: Option<Completion>,
    requests: Mutex<Vec<Request>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockClient {
    /// Create a mock client with a sequence of completions.
    pub fn new(completions: impl IntoIterator<Item = Completion>) -> Self {
        Self {
            script: Mutex::new(completions.into_iter().map(Ok).collect()),
            ..Default::default()
        }
    }

    /// Create a mock client that answers every request with `completion`.
    pub fn repeating(completion: Completion) -> Self {
        Self {
            fallback: Some(completion),
            ..Default::default()
        }
    }

    /// Queue an API failure after the completions scripted so far.
    pub fn then_fail(self, status: u16, message: impl Into<String>) -> Self {
        lock(&self.script).push_back(Err((status, message.into())));
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.requests).clone()
    }

    fn next(&self, req: &Request) -> Result<Completion, LlmError> {
        lock(&self.requests).push(req.clone());
        match lock(&self.script).pop_front() {
            Some(Ok(completion)) => Ok(completion),
            Some(Err((status, message))) => Err(LlmError::Api { status, message }),
            None => Ok(self
                .fallback
                .clone()
                .unwrap_or_else(|| Completion::Reply(String::new()))),
        }
    }
}

/// Split a completion into the chunk sequence a streaming server would send.
fn into_chunks(completion: Completion) -> Vec<ChatChunk> {
    let (content, call) = match completion {
        Completion::Reply(text) => (text, None),
        Completion::FunctionCall { content, call } => (content, Some(call)),
    };

    let chars: Vec<char> = content.chars().collect();
    let mut chunks: Vec<ChatChunk> = chars
        .chunks(2)
        .map(|piece| ChatChunk::text(piece.iter().collect::<String>()))
        .collect();

    match call {
        None => chunks.push(ChatChunk::finish(FinishReason::Stop)),
        Some(call) => {
            let split = call
                .arguments
                .char_indices()
                .nth(call.arguments.chars().count() / 2)
                .map_or(call.arguments.len(), |(i, _)| i);
            let (head, tail) = call.arguments.split_at(split);
            chunks.push(ChatChunk {
                function_call: Some(FunctionCallDelta {
                    name: Some(call.name.clone()),
                    arguments: Some(head.to_string()),
                }),
                ..Default::default()
            });
            chunks.push(ChatChunk {
                function_call: Some(FunctionCallDelta {
                    name: None,
                    arguments: Some(tail.to_string()),
                }),
                finish_reason: Some(FinishReason::FunctionCall),
                ..Default::default()
            });
        }
    }
    chunks
}

#[async_trait]
impl LlmClient for MockClient {
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError> {
        let completion = self.next(req)?;
        let finish_reason = match completion {
            Completion::Reply(_) => FinishReason::Stop,
            Completion::FunctionCall { .. } => FinishReason::FunctionCall,
        };
        Ok(Response {
            id: "mock".to_string(),
            model: req.model.clone(),
            message: completion.into_message(),
            finish_reason,
            usage: Usage::default(),
        })
    }

    fn create_message_stream(&self, req: &Request) -> ChunkStream {
        let chunks = self.next(req).map(into_chunks);
        Box::pin(async_stream::try_stream! {
            for chunk in chunks? {
                yield chunk;
            }
        })
    }
}
