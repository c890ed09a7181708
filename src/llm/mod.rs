// ABOUTME: LLM module - completion endpoint abstraction and the
// ABOUTME: OpenAI-compatible client used to reach the local model server.

mod client;
pub mod mock;
mod openai;
pub mod stream_accumulator;
mod types;

pub use client::*;
pub use mock::MockClient;
pub use openai::*;
pub use stream_accumulator::{StreamAccumulator, StreamStep, collect_stream};
pub use types::*;

#[cfg(test)]
mod types_test;
