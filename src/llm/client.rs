// ABOUTME: Defines the LlmClient trait - the completion endpoint contract
// ABOUTME: used by the orchestrator, with streaming and non-streaming calls.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::{ChatChunk, Request, Response};
use crate::error::LlmError;

/// A boxed stream of completion chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, LlmError>> + Send + 'static>>;

/// Trait for completion endpoint implementations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Create a completion (non-streaming).
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError>;

    /// Create a completion with a streaming response.
    fn create_message_stream(&self, req: &Request) -> ChunkStream;
}
