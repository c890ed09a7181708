// ABOUTME: OpenAI-compatible chat completions client (function-calling dialect).
// ABOUTME: Talks to locally hosted servers such as a ChatGLM3 API endpoint.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use super::client::{ChunkStream, LlmClient};
use super::{
    ChatChunk, FinishReason, FunctionCall, FunctionCallDelta, Message, Request, Response, Role,
    Usage,
};
use crate::config::Config;
use crate::error::LlmError;
use crate::tool::ToolSpec;

/// Base URL of a locally hosted OpenAI-compatible server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:6006/v1";

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "chatglm3";

/// OpenAI API request format.
#[derive(Debug, Serialize)]
pub struct OpenAIRequest<'a> {
    pub model: String,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "no_functions")]
    pub functions: &'a [ToolSpec],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub stream: bool,
}

fn no_functions(functions: &&[ToolSpec]) -> bool {
    functions.is_empty()
}

impl<'a> From<&'a Request> for OpenAIRequest<'a> {
    fn from(req: &'a Request) -> Self {
        OpenAIRequest {
            model: req.model.clone(),
            messages: &req.messages,
            functions: &req.functions,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            stream: false,
        }
    }
}

/// OpenAI tool call, accepted from servers that answer in the newer dialect.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIToolCall {
    pub function: FunctionCall,
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<OpenAIChoice>,
    pub usage: Option<OpenAIUsage>,
}

/// OpenAI response choice.
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIResponseMessage,
    pub finish_reason: Option<String>,
}

/// OpenAI response message.
#[derive(Debug, Deserialize)]
pub struct OpenAIResponseMessage {
    pub content: Option<String>,
    pub function_call: Option<FunctionCall>,
    pub tool_calls: Option<Vec<OpenAIToolCall>>,
}

/// OpenAI usage stats.
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
pub struct OpenAIError {
    pub error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIErrorDetail {
    pub message: String,
}

/// OpenAI streaming chunk.
#[derive(Debug, Deserialize)]
pub struct OpenAIStreamChunk {
    pub choices: Vec<OpenAIStreamChoice>,
}

/// OpenAI streaming choice.
#[derive(Debug, Deserialize)]
pub struct OpenAIStreamChoice {
    pub delta: OpenAIDelta,
    pub finish_reason: Option<String>,
}

/// OpenAI streaming delta.
#[derive(Debug, Default, Deserialize)]
pub struct OpenAIDelta {
    pub content: Option<String>,
    pub function_call: Option<OpenAIFunctionDelta>,
    pub tool_calls: Option<Vec<OpenAIToolCallDelta>>,
}

/// OpenAI streaming function delta.
#[derive(Debug, Deserialize)]
pub struct OpenAIFunctionDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// OpenAI streaming tool call delta.
#[derive(Debug, Deserialize)]
pub struct OpenAIToolCallDelta {
    pub function: Option<OpenAIFunctionDelta>,
}

impl From<OpenAIFunctionDelta> for FunctionCallDelta {
    fn from(delta: OpenAIFunctionDelta) -> Self {
        FunctionCallDelta {
            name: delta.name,
            arguments: delta.arguments,
        }
    }
}

impl TryFrom<OpenAIResponse> for Response {
    type Error = LlmError;

    fn try_from(resp: OpenAIResponse) -> Result<Self, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        let OpenAIResponseMessage {
            content,
            function_call,
            tool_calls,
        } = choice.message;

        // Only the first call is honoured; the loop runs one tool per turn.
        let function_call = function_call.or_else(|| {
            tool_calls
                .and_then(|calls| calls.into_iter().next())
                .map(|c| c.function)
        });

        let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        let finish_reason = match choice.finish_reason.as_deref() {
            Some(reason) => FinishReason::parse(reason),
            None if function_call.is_some() => FinishReason::FunctionCall,
            None => FinishReason::Stop,
        };

        Ok(Response {
            id: resp.id,
            model: resp.model,
            message: Message {
                role: Role::Assistant,
                content,
                function_call,
                name: None,
            },
            finish_reason,
            usage,
        })
    }
}

impl From<OpenAIStreamChoice> for ChatChunk {
    fn from(choice: OpenAIStreamChoice) -> Self {
        let OpenAIDelta {
            content,
            function_call,
            tool_calls,
        } = choice.delta;

        let function_call = function_call
            .or_else(|| {
                tool_calls
                    .and_then(|calls| calls.into_iter().next())
                    .and_then(|c| c.function)
            })
            .map(FunctionCallDelta::from);

        ChatChunk {
            content,
            function_call,
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
        }
    }
}

pub(crate) fn parse_sse_line(line: &str) -> Option<Result<OpenAIStreamChunk, serde_json::Error>> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return None;
    }
    Some(serde_json::from_str(data))
}

async fn api_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let message = match response.text().await {
        Ok(body) => serde_json::from_str::<OpenAIError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body),
        Err(e) => e.to_string(),
    };
    LlmError::Api { status, message }
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    base_url: String,
    api_key: String,
    default_model: String,
    http: reqwest::Client,
}

impl OpenAIClient {
    /// Create a client for the server at `base_url` (e.g. "http://127.0.0.1:6006/v1").
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            default_model: DEFAULT_MODEL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Create a client from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.llm_base_url, &config.llm_api_key)
            .with_default_model(&config.llm_model)
    }

    /// Set the model used when a request does not name one.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Use a custom reqwest client (timeouts, proxies).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn wire_request<'a>(&self, req: &'a Request, stream: bool) -> OpenAIRequest<'a> {
        let mut wire = OpenAIRequest::from(req);
        if wire.model.is_empty() {
            wire.model = self.default_model.clone();
        }
        wire.stream = stream;
        wire
    }
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, "EMPTY")
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError> {
        let wire = self.wire_request(req, false);

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&wire)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let openai_resp: OpenAIResponse = response.json().await?;
        Response::try_from(openai_resp)
    }

    fn create_message_stream(&self, req: &Request) -> ChunkStream {
        // Serialize eagerly: the stream must not borrow `req`.
        let body = serde_json::to_vec(&self.wire_request(req, true));
        let url = self.endpoint();
        let api_key = self.api_key.clone();
        let http = self.http.clone();

        Box::pin(async_stream::try_stream! {
            let response = http
                .post(&url)
                .bearer_auth(&api_key)
                .header("Content-Type", "application/json")
                .body(body?)
                .send()
                .await?;

            if !response.status().is_success() {
                Err::<(), _>(api_error(response).await)?;
                return;
            }

            let chunks = decode_sse(response.bytes_stream());
            futures::pin_mut!(chunks);
            while let Some(chunk) = futures::StreamExt::next(&mut chunks).await {
                yield chunk?;
            }
        })
    }
}

/// Turn an SSE byte stream into chunks.
///
/// Bytes are buffered until a newline arrives, so a multi-byte character
/// split across two reads is decoded whole.
fn decode_sse<S, B, E>(bytes: S) -> impl Stream<Item = Result<ChatChunk, LlmError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
    LlmError: From<E>,
{
    async_stream::try_stream! {
        futures::pin_mut!(bytes);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(piece) = futures::StreamExt::next(&mut bytes).await {
            buffer.extend_from_slice(piece?.as_ref());

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if line.is_empty() {
                    continue;
                }

                if let Some(chunk) = parse_sse_line(&line) {
                    for choice in chunk?.choices {
                        yield ChatChunk::from(choice);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod openai_test {
    use super::*;
    use crate::llm::stream_accumulator::collect_stream;
    use crate::llm::Completion;
    use crate::tool::ParamSpec;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reservoir_spec() -> ToolSpec {
        ToolSpec {
            name: "get_reservoir_info".into(),
            description: "查询水库的库水位".into(),
            params: vec![ParamSpec::new("pubtime", "str", "记录的时间", true)],
        }
    }

    #[test]
    fn test_request_serialization() {
        let req = Request::new("chatglm3")
            .message(Message::system("从现在起请你扮演一位水利专家与我对话"))
            .message(Message::user("你好"))
            .functions(vec![reservoir_spec()]);

        let wire = serde_json::to_value(OpenAIRequest::from(&req)).unwrap();
        assert_eq!(wire["model"], "chatglm3");
        assert_eq!(wire["stream"], false);
        assert_eq!(wire["messages"][0]["role"], "system");
        assert_eq!(wire["messages"][1]["content"], "你好");
        assert_eq!(wire["functions"][0]["name"], "get_reservoir_info");
        assert_eq!(wire["functions"][0]["params"][0]["type"], "str");
        assert!(wire.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_without_functions_omits_field() {
        let req = Request::new("chatglm3").message(Message::user("hi"));
        let wire = serde_json::to_value(OpenAIRequest::from(&req)).unwrap();
        assert!(wire.get("functions").is_none());
    }

    #[test]
    fn test_default_model_fills_empty() {
        let client = OpenAIClient::default().with_default_model("qwen");
        let req = Request::new("");
        assert_eq!(client.wire_request(&req, true).model, "qwen");
        assert!(client.wire_request(&req, true).stream);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = OpenAIClient::new("http://localhost:6006/v1/", "k");
        assert_eq!(client.endpoint(), "http://localhost:6006/v1/chat/completions");
    }

    #[test]
    fn test_response_with_tool_calls_dialect() {
        let resp: OpenAIResponse = serde_json::from_value(json!({
            "id": "c1",
            "model": "m",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_rain_info", "arguments": "{}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let response = Response::try_from(resp).unwrap();
        assert_eq!(response.finish_reason, FinishReason::FunctionCall);
        assert_eq!(response.function_call().unwrap().name, "get_rain_info");
    }

    #[test]
    fn test_response_without_choices() {
        let resp: OpenAIResponse =
            serde_json::from_value(json!({"id": "c1", "model": "m", "choices": []})).unwrap();
        assert!(matches!(
            Response::try_from(resp),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn test_parse_sse_line() {
        assert!(parse_sse_line("data: [DONE]").is_none());
        assert!(parse_sse_line(": keep-alive").is_none());
        let chunk = parse_sse_line(r#"data: {"choices":[{"delta":{"content":"hi"},"finish_reason":null}]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_create_message_function_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "model": "chatglm3",
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "function_call": {
                            "name": "get_reservoir_info",
                            "arguments": "{\"pubtime\": \"2021-07-15\"}"
                        }
                    },
                    "finish_reason": "function_call"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAIClient::new(format!("{}/v1", server.uri()), "secret");
        let response = client
            .create_message(&Request::new("chatglm3").message(Message::user("桃林口水位")))
            .await
            .unwrap();

        assert_eq!(response.finish_reason, FinishReason::FunctionCall);
        let call = response.function_call().unwrap();
        assert_eq!(call.name, "get_reservoir_info");
        assert_eq!(call.arguments, "{\"pubtime\": \"2021-07-15\"}");
        assert_eq!(response.usage.input_tokens, 12);
    }

    #[tokio::test]
    async fn test_create_message_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": {"message": "model loading", "type": "server_error"}
            })))
            .mount(&server)
            .await;

        let client = OpenAIClient::new(format!("{}/v1", server.uri()), "k");
        let err = client
            .create_message(&Request::new("chatglm3"))
            .await
            .unwrap_err();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "model loading");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_message_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = OpenAIClient::new(server.uri(), "k");
        let err = client
            .create_message(&Request::new("chatglm3"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 502, ref message } if message == "bad gateway"));
    }

    #[tokio::test]
    async fn test_stream_function_call() {
        let body = [
            r#"data: {"choices":[{"delta":{"role":"assistant","content":""},"finish_reason":null}]}"#,
            r#"data: {"choices":[{"delta":{"content":"好的"},"finish_reason":null}]}"#,
            r#"data: {"choices":[{"delta":{"function_call":{"name":"get_rain_info","arguments":"{\"pubtime\":\"2021-07-15\"}"}},"finish_reason":"function_call"}]}"#,
            "data: [DONE]",
            "",
        ]
        .join("\n\n");

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let client = OpenAIClient::new(format!("{}/v1", server.uri()), "k");
        let stream = client.create_message_stream(&Request::new("chatglm3"));
        let completion = collect_stream(stream, |_| {}).await.unwrap();

        assert_eq!(
            completion,
            Completion::FunctionCall {
                content: "好的".into(),
                call: FunctionCall::new("get_rain_info", r#"{"pubtime":"2021-07-15"}"#),
            }
        );
    }

    #[tokio::test]
    async fn test_sse_decoder_keeps_characters_split_across_reads() {
        let body = concat!(
            r#"data: {"choices":[{"delta":{"content":"桃林口"},"finish_reason":null}]}"#,
            "\n\n",
            r#"data: {"choices":[{"delta":{"function_call":{"name":"get_reservoir_info","arguments":"{\"reservoir_name\":\"潘家口\"}"}},"finish_reason":"function_call"}]}"#,
            "\n\ndata: [DONE]\n\n",
        )
        .as_bytes();

        // Cut inside the three-byte encodings of 桃 and 潘.
        let first = body.windows(3).position(|w| w == "桃".as_bytes()).unwrap() + 1;
        let second = body.windows(3).position(|w| w == "潘".as_bytes()).unwrap() + 2;
        let pieces: Vec<Result<Vec<u8>, LlmError>> = vec![
            Ok(body[..first].to_vec()),
            Ok(body[first..second].to_vec()),
            Ok(body[second..].to_vec()),
        ];

        let mut seen = String::new();
        let completion = collect_stream(decode_sse(futures::stream::iter(pieces)), |t| {
            seen.push_str(t)
        })
        .await
        .unwrap();

        assert_eq!(seen, "桃林口");
        assert_eq!(
            completion,
            Completion::FunctionCall {
                content: "桃林口".into(),
                call: FunctionCall::new("get_reservoir_info", r#"{"reservoir_name":"潘家口"}"#),
            }
        );
    }

    #[tokio::test]
    async fn test_stream_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let client = OpenAIClient::new(server.uri(), "k");
        let stream = client.create_message_stream(&Request::new("chatglm3"));
        let result = collect_stream(stream, |_| {}).await;
        assert!(matches!(result, Err(LlmError::Api { status: 500, .. })));
    }
}
