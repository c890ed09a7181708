// ABOUTME: Tests for LLM types - serialization, deserialization, helpers.
// ABOUTME: Verifies JSON format matches the chat completions wire format.

use super::*;

#[test]
fn test_role_serialization() {
    assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    assert_eq!(
        serde_json::to_string(&Role::Function).unwrap(),
        "\"function\""
    );
    assert_eq!(
        serde_json::to_string(&Role::System).unwrap(),
        "\"system\""
    );
}

#[test]
fn test_role_deserialization_accepts_tool_alias() {
    assert_eq!(
        serde_json::from_str::<Role>("\"tool\"").unwrap(),
        Role::Function
    );
    assert_eq!(
        serde_json::from_str::<Role>("\"assistant\"").unwrap(),
        Role::Assistant
    );
}

#[test]
fn test_user_message_serialization() {
    let json = serde_json::to_value(Message::user("你好")).unwrap();
    assert_eq!(json, serde_json::json!({"role": "user", "content": "你好"}));
}

#[test]
fn test_function_call_message_serialization() {
    let msg = Message::function_call("", FunctionCall::new("get_rain_info", "{}"));
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["role"], "assistant");
    assert!(json["content"].is_null());
    assert_eq!(json["function_call"]["name"], "get_rain_info");
    assert_eq!(json["function_call"]["arguments"], "{}");
    assert!(json.get("name").is_none());
}

#[test]
fn test_function_result_message() {
    let msg = Message::function_result("get_rain_info", "[]");
    assert_eq!(msg.role, Role::Function);
    assert_eq!(msg.name.as_deref(), Some("get_rain_info"));
    assert_eq!(msg.text(), "[]");

    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["name"], "get_rain_info");
}

#[test]
fn test_message_deserialization_with_missing_fields() {
    let msg: Message = serde_json::from_str(r#"{"role": "assistant"}"#).unwrap();
    assert_eq!(msg.role, Role::Assistant);
    assert!(msg.content.is_none());
    assert!(msg.function_call.is_none());
    assert_eq!(msg.text(), "");
}

#[test]
fn test_request_builder() {
    let req = Request::new("chatglm3")
        .message(Message::system("从现在起请你扮演一位水利专家与我对话"))
        .messages(vec![Message::user("Hi")])
        .max_tokens(1024)
        .temperature(0.7);

    assert_eq!(req.model, "chatglm3");
    assert_eq!(req.messages.len(), 2);
    assert!(req.functions.is_empty());
    assert_eq!(req.max_tokens, Some(1024));
    assert_eq!(req.temperature, Some(0.7));
}

#[test]
fn test_finish_reason_parse() {
    assert_eq!(FinishReason::parse("stop"), FinishReason::Stop);
    assert_eq!(
        FinishReason::parse("function_call"),
        FinishReason::FunctionCall
    );
    assert_eq!(FinishReason::parse("tool_calls"), FinishReason::FunctionCall);
    assert_eq!(FinishReason::parse("length"), FinishReason::Length);
    assert_eq!(FinishReason::parse("whatever"), FinishReason::Stop);
}

#[test]
fn test_completion_from_response() {
    let response = Response {
        id: "1".into(),
        model: "chatglm3".into(),
        message: Message::function_call("", FunctionCall::new("get_rain_info", "{}")),
        finish_reason: FinishReason::FunctionCall,
        usage: Usage::default(),
    };
    assert_eq!(
        Completion::from(response),
        Completion::FunctionCall {
            content: String::new(),
            call: FunctionCall::new("get_rain_info", "{}"),
        }
    );

    let response = Response {
        id: "2".into(),
        model: "chatglm3".into(),
        message: Message::assistant("Hello"),
        finish_reason: FinishReason::Stop,
        usage: Usage::default(),
    };
    assert_eq!(Completion::from(response), Completion::Reply("Hello".into()));
}

#[test]
fn test_completion_into_message() {
    assert_eq!(
        Completion::Reply("Hello".into()).into_message(),
        Message::assistant("Hello")
    );

    let msg = Completion::FunctionCall {
        content: "checking".into(),
        call: FunctionCall::new("x", "{}"),
    }
    .into_message();
    assert_eq!(msg.text(), "checking");
    assert!(msg.function_call.is_some());
}
