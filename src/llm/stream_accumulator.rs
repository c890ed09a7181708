// ABOUTME: Folds a stream of ChatChunks into a single Completion.
// ABOUTME: Text and argument fragments are appended in arrival order.

use futures::{Stream, StreamExt};

use super::{ChatChunk, Completion, FinishReason, FunctionCall};
use crate::error::LlmError;

/// Buffer for a completion that has not finished yet.
///
/// [`push`](Self::push) consumes the buffer and hands back either the grown
/// buffer or the finished [`Completion`], so a stream is consumed as a fold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamAccumulator {
    text: String,
    call_name: Option<String>,
    call_arguments: String,
}

/// Result of folding one chunk into the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStep {
    Pending(StreamAccumulator),
    Finished(Completion),
}

impl StreamAccumulator {
    /// Create a new empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a chunk into the buffer.
    pub fn push(mut self, chunk: &ChatChunk) -> StreamStep {
        if let Some(text) = &chunk.content {
            self.text.push_str(text);
        }
        if let Some(delta) = &chunk.function_call {
            if self.call_name.is_none() {
                self.call_name = delta.name.clone().filter(|n| !n.is_empty());
            }
            if let Some(args) = &delta.arguments {
                self.call_arguments.push_str(args);
            }
        }

        match chunk.finish_reason {
            None => StreamStep::Pending(self),
            Some(reason) => StreamStep::Finished(self.finish(reason)),
        }
    }

    /// Returns true once a chunk has named a function.
    pub fn in_function_call(&self) -> bool {
        self.call_name.is_some()
    }

    // A `function_call` finish without a named function carries nothing to
    // dispatch, so it finalizes as a reply.
    fn finish(self, reason: FinishReason) -> Completion {
        match (reason, self.call_name) {
            (FinishReason::FunctionCall, Some(name)) => Completion::FunctionCall {
                content: self.text,
                call: FunctionCall {
                    name,
                    arguments: self.call_arguments,
                },
            },
            _ => Completion::Reply(self.text),
        }
    }
}

/// Drive a chunk stream to its terminal chunk.
///
/// `on_delta` sees each text fragment as it arrives. Chunks after the
/// terminal one are not read. A stream that ends without a finish reason
/// yields [`LlmError::StreamClosed`].
pub async fn collect_stream<S, F>(stream: S, mut on_delta: F) -> Result<Completion, LlmError>
where
    S: Stream<Item = Result<ChatChunk, LlmError>>,
    F: FnMut(&str),
{
    futures::pin_mut!(stream);
    let mut acc = StreamAccumulator::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if let Some(text) = chunk.content.as_deref().filter(|t| !t.is_empty()) {
            on_delta(text);
        }
        acc = match acc.push(&chunk) {
            StreamStep::Pending(acc) => acc,
            StreamStep::Finished(completion) => return Ok(completion),
        };
    }

    Err(LlmError::StreamClosed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FunctionCallDelta;

    fn call_chunk(name: Option<&str>, args: &str) -> ChatChunk {
        ChatChunk {
            content: None,
            function_call: Some(FunctionCallDelta {
                name: name.map(str::to_string),
                arguments: Some(args.to_string()),
            }),
            finish_reason: None,
        }
    }

    fn fold(chunks: &[ChatChunk]) -> StreamStep {
        let mut step = StreamStep::Pending(StreamAccumulator::new());
        for chunk in chunks {
            step = match step {
                StreamStep::Pending(acc) => acc.push(chunk),
                finished => return finished,
            };
        }
        step
    }

    #[test]
    fn test_accumulate_text_only() {
        let step = fold(&[
            ChatChunk::text("Hello"),
            ChatChunk::text(" world"),
            ChatChunk::finish(FinishReason::Stop),
        ]);
        assert_eq!(
            step,
            StreamStep::Finished(Completion::Reply("Hello world".into()))
        );
    }

    #[test]
    fn test_accumulate_function_call() {
        let step = fold(&[
            call_chunk(Some("get_rain_info"), r#"{"pubtime": "#),
            call_chunk(None, r#""2021-07-15"}"#),
            ChatChunk::finish(FinishReason::FunctionCall),
        ]);
        match step {
            StreamStep::Finished(Completion::FunctionCall { content, call }) => {
                assert_eq!(content, "");
                assert_eq!(call.name, "get_rain_info");
                assert_eq!(call.arguments, r#"{"pubtime": "2021-07-15"}"#);
            }
            other => panic!("Expected FunctionCall, got {:?}", other),
        }
    }

    #[test]
    fn test_call_carried_on_terminal_chunk() {
        let mut last = call_chunk(Some("get_reservoir_info"), "{}");
        last.finish_reason = Some(FinishReason::FunctionCall);

        let step = fold(&[ChatChunk::text("Checking."), last]);
        match step {
            StreamStep::Finished(Completion::FunctionCall { content, call }) => {
                assert_eq!(content, "Checking.");
                assert_eq!(call.name, "get_reservoir_info");
                assert_eq!(call.arguments, "{}");
            }
            other => panic!("Expected FunctionCall, got {:?}", other),
        }
    }

    #[test]
    fn test_function_finish_without_name_is_reply() {
        let step = fold(&[
            ChatChunk::text("partial"),
            ChatChunk::finish(FinishReason::FunctionCall),
        ]);
        assert_eq!(step, StreamStep::Finished(Completion::Reply("partial".into())));
    }

    #[test]
    fn test_in_function_call() {
        let acc = StreamAccumulator::new();
        assert!(!acc.in_function_call());

        let StreamStep::Pending(acc) = acc.push(&call_chunk(Some("x"), "")) else {
            panic!("Expected Pending");
        };
        assert!(acc.in_function_call());
    }

    #[tokio::test]
    async fn test_collect_stream_reports_deltas_in_order() {
        let chunks = vec![
            Ok(ChatChunk::text("水位")),
            Ok(ChatChunk::text("正常")),
            Ok(ChatChunk::finish(FinishReason::Stop)),
            Ok(ChatChunk::text("ignored")),
        ];
        let mut seen = Vec::new();
        let completion = collect_stream(futures::stream::iter(chunks), |t| seen.push(t.to_string()))
            .await
            .unwrap();

        assert_eq!(completion, Completion::Reply("水位正常".into()));
        assert_eq!(seen, vec!["水位", "正常"]);
    }

    #[tokio::test]
    async fn test_collect_stream_without_finish() {
        let chunks = vec![Ok(ChatChunk::text("cut off"))];
        let result = collect_stream(futures::stream::iter(chunks), |_| {}).await;
        assert!(matches!(result, Err(LlmError::StreamClosed)));
    }

    #[tokio::test]
    async fn test_collect_stream_propagates_errors() {
        let chunks = vec![
            Ok(ChatChunk::text("a")),
            Err(LlmError::Api {
                status: 500,
                message: "boom".into(),
            }),
        ];
        let result = collect_stream(futures::stream::iter(chunks), |_| {}).await;
        assert!(matches!(result, Err(LlmError::Api { status: 500, .. })));
    }
}
