// ABOUTME: Conversation module - drives the multi-turn function-calling
// ABOUTME: protocol between the caller, the model, and the tool registry.

mod orchestrator;
mod outcome;

pub use orchestrator::*;
pub use outcome::*;
