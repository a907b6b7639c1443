use routecodex_protocol::json::{get_path, FieldPath};
use routecodex_protocol::{Json, ProviderProtocol};
use serde_json::{json, Value};

use crate::{CodecContext, CodecError, ConversionCodec};

/// The `anthropic <-> openai-chat` codec pair named in the conversion
/// facade's catalog. Handles both directions depending on which side of
/// `ctx` is currently Anthropic-shaped.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnthropicOpenAiCodec;

impl ConversionCodec for AnthropicOpenAiCodec {
    fn convert_request(&self, payload: Json, ctx: &CodecContext) -> Result<Json, CodecError> {
        match (ctx.client_protocol, ctx.target_protocol) {
            (ProviderProtocol::Anthropic, ProviderProtocol::OpenAiChat) => {
                anthropic_request_to_openai_chat(payload)
            }
            (ProviderProtocol::OpenAiChat, ProviderProtocol::Anthropic) => {
                openai_chat_request_to_anthropic(payload)
            }
            (from, to) => Err(unsupported_direction(from, to)),
        }
    }

    fn convert_response(&self, payload: Json, ctx: &CodecContext) -> Result<Json, CodecError> {
        match (ctx.client_protocol, ctx.target_protocol) {
            (ProviderProtocol::Anthropic, ProviderProtocol::OpenAiChat) => {
                openai_chat_response_to_anthropic(payload)
            }
            (ProviderProtocol::OpenAiChat, ProviderProtocol::Anthropic) => {
                anthropic_response_to_openai_chat(payload)
            }
            (from, to) => Err(unsupported_direction(from, to)),
        }
    }
}

fn unsupported_direction(from: ProviderProtocol, to: ProviderProtocol) -> CodecError {
    CodecError::root(format!(
        "AnthropicOpenAiCodec does not handle {from} -> {to}"
    ))
}

/// Anthropic `/v1/messages` body -> OpenAI `/v1/chat/completions` body.
pub fn anthropic_request_to_openai_chat(payload: Json) -> Result<Json, CodecError> {
    let model = field_str(&payload, "model")?;
    let max_tokens = payload.get("max_tokens").cloned();
    let stream = payload.get("stream").and_then(Value::as_bool).unwrap_or(false);

    let mut messages = Vec::new();
    if let Some(system) = payload.get("system") {
        messages.push(json!({"role": "system", "content": system}));
    }

    let source_messages = get_path(&payload, "messages")
        .and_then(Value::as_array)
        .ok_or_else(|| CodecError::at(FieldPath::root().push("messages"), "missing messages array"))?;

    for (i, message) in source_messages.iter().enumerate() {
        let role = field_str(message, "role")?;
        let blocks = message
            .get("content")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut tool_results = Vec::new();
        for block in &blocks {
            match block.get("type").and_then(Value::as_str) {
                Some("text") => {
                    if let Some(t) = block.get("text").and_then(Value::as_str) {
                        text.push_str(t);
                    }
                }
                Some("tool_use") => {
                    tool_calls.push(json!({
                        "id": block.get("id").cloned().unwrap_or(Value::Null),
                        "type": "function",
                        "function": {
                            "name": block.get("name").cloned().unwrap_or(Value::Null),
                            "arguments": block.get("input").map(Value::to_string).unwrap_or_default(),
                        }
                    }));
                }
                Some("tool_result") => {
                    tool_results.push(block.clone());
                }
                _ => {}
            }
        }

        if !tool_results.is_empty() {
            for result in tool_results {
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": result.get("tool_use_id").cloned().unwrap_or(Value::Null),
                    "content": result.get("content").cloned().unwrap_or(Value::Null),
                }));
            }
            continue;
        }

        let mut out = json!({"role": role, "content": text});
        if !tool_calls.is_empty() {
            out["tool_calls"] = Value::Array(tool_calls);
            out["content"] = Value::Null;
        }
        let _ = i;
        messages.push(out);
    }

    let mut request = json!({
        "model": model,
        "stream": stream,
        "messages": messages,
    });
    if let Some(max_tokens) = max_tokens {
        request["max_tokens"] = max_tokens;
    }
    if let Some(tools) = payload.get("tools") {
        request["tools"] = json!(tools
            .as_array()
            .unwrap_or(&Vec::new())
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.get("name").cloned().unwrap_or(Value::Null),
                        "description": tool.get("description").cloned().unwrap_or(Value::Null),
                        "parameters": tool.get("input_schema").cloned().unwrap_or(json!({})),
                    }
                })
            })
            .collect::<Vec<_>>());
    }
    if let Some(tool_choice) = payload.get("tool_choice") {
        request["tool_choice"] = translate_anthropic_tool_choice(tool_choice);
    }
    Ok(request)
}

fn translate_anthropic_tool_choice(tool_choice: &Json) -> Json {
    match tool_choice.get("type").and_then(Value::as_str) {
        Some("any") => json!("required"),
        Some("tool") => json!({
            "type": "function",
            "function": {"name": tool_choice.get("name").cloned().unwrap_or(Value::Null)}
        }),
        _ => json!("auto"),
    }
}

/// OpenAI chat completion response -> Anthropic message response.
pub fn openai_chat_response_to_anthropic(payload: Json) -> Result<Json, CodecError> {
    let model = field_str(&payload, "model")?;
    let id = payload
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("msg_unknown")
        .to_string();

    let choice = get_path(&payload, "choices.0").ok_or_else(|| {
        CodecError::at(FieldPath::root().push("choices"), "expected at least one choice")
    })?;
    let message = choice.get("message").cloned().unwrap_or(json!({}));
    let finish_reason = choice.get("finish_reason").and_then(Value::as_str);

    let mut content = Vec::new();
    if let Some(text) = message.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            content.push(json!({"type": "text", "text": text}));
        }
    }
    if let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) {
        for call in tool_calls {
            let arguments = call
                .get("function")
                .and_then(|f| f.get("arguments"))
                .and_then(Value::as_str)
                .unwrap_or("{}");
            let input: Value = serde_json::from_str(arguments).unwrap_or(json!({}));
            content.push(json!({
                "type": "tool_use",
                "id": call.get("id").cloned().unwrap_or(Value::Null),
                "name": call.get("function").and_then(|f| f.get("name")).cloned().unwrap_or(Value::Null),
                "input": input,
            }));
        }
    }

    let stop_reason = match finish_reason {
        Some("tool_calls") => "tool_use",
        Some("length") => "max_tokens",
        _ => "end_turn",
    };

    let mut response = json!({
        "id": id,
        "type": "message",
        "role": "assistant",
        "model": model,
        "content": content,
        "stop_reason": stop_reason,
    });
    if let Some(usage) = payload.get("usage") {
        response["usage"] = json!({
            "input_tokens": usage.get("prompt_tokens").cloned().unwrap_or(json!(0)),
            "output_tokens": usage.get("completion_tokens").cloned().unwrap_or(json!(0)),
        });
    }
    Ok(response)
}

/// OpenAI `/v1/chat/completions` body -> Anthropic `/v1/messages` body.
/// The mirror direction, used when the client speaks OpenAI Chat but the
/// resolved target is an Anthropic-protocol provider.
pub fn openai_chat_request_to_anthropic(payload: Json) -> Result<Json, CodecError> {
    let model = field_str(&payload, "model")?;
    let stream = payload.get("stream").and_then(Value::as_bool).unwrap_or(false);
    let max_tokens = payload
        .get("max_tokens")
        .cloned()
        .unwrap_or(json!(4096));

    let source_messages = get_path(&payload, "messages")
        .and_then(Value::as_array)
        .ok_or_else(|| CodecError::at(FieldPath::root().push("messages"), "missing messages array"))?;

    let mut system = None;
    let mut messages = Vec::new();
    for message in source_messages {
        let role = field_str(message, "role")?;
        if role == "system" {
            system = message.get("content").cloned();
            continue;
        }
        let text = message.get("content").and_then(Value::as_str).unwrap_or("");
        messages.push(json!({
            "role": if role == "assistant" { "assistant" } else { "user" },
            "content": [{"type": "text", "text": text}],
        }));
    }

    let mut request = json!({
        "model": model,
        "max_tokens": max_tokens,
        "stream": stream,
        "messages": messages,
    });
    if let Some(system) = system {
        request["system"] = system;
    }
    Ok(request)
}

/// Anthropic message response -> OpenAI chat completion response.
pub fn anthropic_response_to_openai_chat(payload: Json) -> Result<Json, CodecError> {
    let model = field_str(&payload, "model")?;
    let id = payload
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("chatcmpl_unknown")
        .to_string();
    let blocks = payload
        .get("content")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut text = String::new();
    for block in &blocks {
        if block.get("type").and_then(Value::as_str) == Some("text") {
            if let Some(t) = block.get("text").and_then(Value::as_str) {
                text.push_str(t);
            }
        }
    }

    let finish_reason = match payload.get("stop_reason").and_then(Value::as_str) {
        Some("tool_use") => "tool_calls",
        Some("max_tokens") => "length",
        _ => "stop",
    };

    let mut response = json!({
        "id": id,
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": finish_reason,
        }],
    });
    if let Some(usage) = payload.get("usage") {
        response["usage"] = json!({
            "prompt_tokens": usage.get("input_tokens").cloned().unwrap_or(json!(0)),
            "completion_tokens": usage.get("output_tokens").cloned().unwrap_or(json!(0)),
            "total_tokens": usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0)
                + usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0),
        });
    }
    Ok(response)
}

fn field_str<'a>(value: &'a Json, field: &str) -> Result<&'a str, CodecError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::at(FieldPath::root().push(field), "expected a string field"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_tool_use_block_into_tool_call() {
        let anthropic = json!({
            "model": "claude-3-opus",
            "max_tokens": 256,
            "messages": [{
                "role": "assistant",
                "content": [{"type": "tool_use", "id": "t1", "name": "shell", "input": {"command": "ls"}}]
            }]
        });
        let openai = anthropic_request_to_openai_chat(anthropic).unwrap();
        let call = &openai["messages"][0]["tool_calls"][0];
        assert_eq!(call["function"]["name"], "shell");
    }

    #[test]
    fn translates_openai_tool_calls_into_tool_use_blocks() {
        let openai = json!({
            "id": "c1",
            "model": "gpt-4.1",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "tool_calls": [{"id": "t1", "function": {"name": "shell", "arguments": "{\"command\":\"ls\"}"}}]
                }
            }]
        });
        let anthropic = openai_chat_response_to_anthropic(openai).unwrap();
        assert_eq!(anthropic["stop_reason"], "tool_use");
        assert_eq!(anthropic["content"][0]["type"], "tool_use");
        assert_eq!(anthropic["content"][0]["input"]["command"], "ls");
    }

    #[test]
    fn round_trips_plain_text_response() {
        let openai = json!({
            "id": "c1",
            "model": "glm-4",
            "choices": [{"index": 0, "finish_reason": "stop", "message": {"role": "assistant", "content": "pong"}}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        });
        let anthropic = openai_chat_response_to_anthropic(openai).unwrap();
        assert_eq!(anthropic["content"][0]["text"], "pong");
        assert_eq!(anthropic["stop_reason"], "end_turn");
    }
}
