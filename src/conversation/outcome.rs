// ABOUTME: Defines Conversation - the history produced by one orchestrator
// ABOUTME: run together with how the run ended.

use crate::llm::{Message, Role};

/// Reply shown to end users when no valid model reply was produced.
pub const APOLOGY: &str = "抱歉，我暂时无法处理您的请求，请稍后再试。";

/// How a conversation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationStatus {
    /// The model produced a final reply.
    Completed,
    /// The model kept requesting tools after the retry budget was spent.
    RetryExhausted,
}

/// Result of running one user turn to completion.
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Full history: prior turns, the new user message, every function call
    /// and result, and the final reply when there is one.
    pub messages: Vec<Message>,
    pub status: ConversationStatus,
    /// Number of tools dispatched during this run.
    pub tool_calls: usize,
}

impl Conversation {
    /// Returns true if the model produced a final reply.
    pub fn is_complete(&self) -> bool {
        self.status == ConversationStatus::Completed
    }

    /// The model's final reply, if it produced a non-empty one.
    pub fn final_reply(&self) -> Option<&str> {
        if !self.is_complete() {
            return None;
        }
        self.messages
            .last()
            .filter(|m| m.role == Role::Assistant && m.function_call.is_none())
            .map(Message::text)
            .filter(|text| !text.trim().is_empty())
    }

    /// The final reply, or the localized apology when there is none.
    pub fn reply_or_apology(&self) -> &str {
        self.final_reply().unwrap_or(APOLOGY)
    }

    /// Consume the conversation, returning its history.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
