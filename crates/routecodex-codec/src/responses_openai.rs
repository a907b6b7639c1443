use routecodex_protocol::json::FieldPath;
use routecodex_protocol::{Json, ProviderProtocol};
use serde_json::{json, Value};

use crate::{CodecContext, CodecError, ConversionCodec};

/// The `openai-responses <-> openai-chat` codec pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponsesOpenAiCodec;

impl ConversionCodec for ResponsesOpenAiCodec {
    fn convert_request(&self, payload: Json, ctx: &CodecContext) -> Result<Json, CodecError> {
        match (ctx.client_protocol, ctx.target_protocol) {
            (ProviderProtocol::OpenAiResponses, ProviderProtocol::OpenAiChat) => {
                responses_request_to_chat(payload)
            }
            (ProviderProtocol::OpenAiChat, ProviderProtocol::OpenAiResponses) => {
                chat_request_to_responses(payload)
            }
            (from, to) => Err(unsupported_direction(from, to)),
        }
    }

    fn convert_response(&self, payload: Json, ctx: &CodecContext) -> Result<Json, CodecError> {
        match (ctx.client_protocol, ctx.target_protocol) {
            (ProviderProtocol::OpenAiResponses, ProviderProtocol::OpenAiChat) => {
                chat_response_to_responses(payload)
            }
            (ProviderProtocol::OpenAiChat, ProviderProtocol::OpenAiResponses) => {
                responses_response_to_chat(payload)
            }
            (from, to) => Err(unsupported_direction(from, to)),
        }
    }
}

fn unsupported_direction(from: ProviderProtocol, to: ProviderProtocol) -> CodecError {
    CodecError::root(format!(
        "ResponsesOpenAiCodec does not handle {from} -> {to}"
    ))
}

/// `/v1/responses` request -> `/v1/chat/completions` request. `input` may
/// be a bare string (single user turn) or an array of role-tagged items.
fn responses_request_to_chat(payload: Json) -> Result<Json, CodecError> {
    let model = field_str(&payload, "model")?;
    let stream = payload.get("stream").and_then(Value::as_bool).unwrap_or(false);

    let input = payload
        .get("input")
        .ok_or_else(|| CodecError::at(FieldPath::root().push("input"), "missing input"))?;

    let messages = match input {
        Value::String(text) => vec![json!({"role": "user", "content": text})],
        Value::Array(items) => items
            .iter()
            .map(|item| {
                json!({
                    "role": item.get("role").cloned().unwrap_or(json!("user")),
                    "content": item.get("content").cloned().unwrap_or(Value::Null),
                })
            })
            .collect(),
        _ => {
            return Err(CodecError::at(
                FieldPath::root().push("input"),
                "input must be a string or an array of items",
            ))
        }
    };

    let mut request = json!({"model": model, "stream": stream, "messages": messages});
    if let Some(tools) = payload.get("tools") {
        request["tools"] = tools.clone();
    }
    Ok(request)
}

/// Non-stream `chat.completion` -> `response` object.
fn chat_response_to_responses(payload: Json) -> Result<Json, CodecError> {
    let model = field_str(&payload, "model")?;
    let id = payload
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("resp_unknown")
        .to_string();
    let content = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .cloned()
        .unwrap_or(Value::Null);

    let mut response = json!({
        "id": id,
        "object": "response",
        "model": model,
        "output": [{
            "type": "message",
            "role": "assistant",
            "content": [{"type": "output_text", "text": content}],
        }],
    });
    if let Some(usage) = payload.get("usage") {
        response["usage"] = usage.clone();
    }
    Ok(response)
}

/// `/v1/chat/completions` request -> `/v1/responses` request, used when the
/// client speaks OpenAI Chat but the resolved target is a Responses-protocol
/// provider.
fn chat_request_to_responses(payload: Json) -> Result<Json, CodecError> {
    let model = field_str(&payload, "model")?;
    let stream = payload.get("stream").and_then(Value::as_bool).unwrap_or(false);
    let messages = payload
        .get("messages")
        .and_then(Value::as_array)
        .ok_or_else(|| CodecError::at(FieldPath::root().push("messages"), "missing messages array"))?;

    let input: Vec<Value> = messages
        .iter()
        .map(|message| {
            json!({
                "role": message.get("role").cloned().unwrap_or(json!("user")),
                "content": message.get("content").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    Ok(json!({"model": model, "stream": stream, "input": input}))
}

/// `response` object -> non-stream `chat.completion`.
fn responses_response_to_chat(payload: Json) -> Result<Json, CodecError> {
    let model = field_str(&payload, "model")?;
    let id = payload
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("chatcmpl_unknown")
        .to_string();

    let text = payload
        .get("output")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|item| item.get("content"))
        .and_then(Value::as_array)
        .and_then(|blocks| blocks.first())
        .and_then(|block| block.get("text"))
        .cloned()
        .unwrap_or(Value::Null);

    Ok(json!({
        "id": id,
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop",
        }],
    }))
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
    fn wraps_bare_string_input_as_single_user_message() {
        let responses = json!({"model": "gpt-4.1", "input": "ping"});
        let chat = responses_request_to_chat(responses).unwrap();
        assert_eq!(chat["messages"][0]["role"], "user");
        assert_eq!(chat["messages"][0]["content"], "ping");
    }

    #[test]
    fn extracts_output_text_from_responses_object() {
        let object = json!({
            "id": "resp_1",
            "model": "gpt-4.1",
            "output": [{"type": "message", "content": [{"type": "output_text", "text": "pong"}]}],
        });
        let chat = responses_response_to_chat(object).unwrap();
        assert_eq!(chat["choices"][0]["message"]["content"], "pong");
    }
}
