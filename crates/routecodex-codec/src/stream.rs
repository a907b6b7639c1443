//! Cross-protocol streaming bridges delegated to by the SSE substrate when
//! the client protocol differs from the provider protocol. These operate on
//! one already-decoded JSON frame at a time; framing (`data: ...\n\n`) is
//! the SSE substrate's job, not this crate's.

use routecodex_protocol::Json;
use serde_json::{json, Value};

/// A single outbound SSE event, named for protocols (Anthropic) that use
/// the `event:` line; OpenAI-family frames leave `name` unset.
#[derive(Debug, Clone)]
pub struct SseEvent {
    pub name: Option<&'static str>,
    pub data: Json,
}

impl SseEvent {
    fn unnamed(data: Json) -> Self {
        Self { name: None, data }
    }

    fn named(name: &'static str, data: Json) -> Self {
        Self {
            name: Some(name),
            data,
        }
    }
}

/// Per-stream state carried across calls to [`openai_chat_delta_to_anthropic`]
/// or [`anthropic_event_to_openai_chat_delta`] for the lifetime of one SSE
/// response.
#[derive(Debug, Default)]
pub struct StreamBridgeState {
    message_started: bool,
    text_block_open: bool,
    tool_block_open: bool,
    block_index: u32,
    message_id: String,
    model: String,
}

/// Translates one OpenAI chat-completion-chunk frame into zero or more
/// Anthropic Messages streaming events.
pub fn openai_chat_delta_to_anthropic(frame: &Json, state: &mut StreamBridgeState) -> Vec<SseEvent> {
    let mut events = Vec::new();

    if !state.message_started {
        state.message_id = frame
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("msg_stream")
            .to_string();
        state.model = frame
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        events.push(SseEvent::named(
            "message_start",
            json!({
                "type": "message_start",
                "message": {
                    "id": state.message_id,
                    "type": "message",
                    "role": "assistant",
                    "model": state.model,
                    "content": [],
                }
            }),
        ));
        state.message_started = true;
    }

    let Some(choice) = frame.get("choices").and_then(Value::as_array).and_then(|c| c.first()) else {
        return events;
    };
    let delta = choice.get("delta").cloned().unwrap_or(json!({}));

    if let Some(text) = delta.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            if !state.text_block_open {
                events.push(SseEvent::named(
                    "content_block_start",
                    json!({
                        "type": "content_block_start",
                        "index": state.block_index,
                        "content_block": {"type": "text", "text": ""},
                    }),
                ));
                state.text_block_open = true;
            }
            events.push(SseEvent::named(
                "content_block_delta",
                json!({
                    "type": "content_block_delta",
                    "index": state.block_index,
                    "delta": {"type": "text_delta", "text": text},
                }),
            ));
        }
    }

    if let Some(tool_calls) = delta.get("tool_calls").and_then(Value::as_array) {
        if let Some(call) = tool_calls.first() {
            if state.text_block_open {
                events.push(close_block(state.block_index));
                state.text_block_open = false;
                state.block_index += 1;
            }
            if !state.tool_block_open {
                events.push(SseEvent::named(
                    "content_block_start",
                    json!({
                        "type": "content_block_start",
                        "index": state.block_index,
                        "content_block": {
                            "type": "tool_use",
                            "id": call.get("id").cloned().unwrap_or(Value::Null),
                            "name": call.get("function").and_then(|f| f.get("name")).cloned().unwrap_or(Value::Null),
                        },
                    }),
                ));
                state.tool_block_open = true;
            }
            if let Some(partial) = call.get("function").and_then(|f| f.get("arguments")).and_then(Value::as_str) {
                events.push(SseEvent::named(
                    "content_block_delta",
                    json!({
                        "type": "content_block_delta",
                        "index": state.block_index,
                        "delta": {"type": "input_json_delta", "partial_json": partial},
                    }),
                ));
            }
        }
    }

    if let Some(finish_reason) = choice.get("finish_reason").and_then(Value::as_str) {
        if state.text_block_open || state.tool_block_open {
            events.push(close_block(state.block_index));
            state.text_block_open = false;
            state.tool_block_open = false;
        }
        let stop_reason = if finish_reason == "tool_calls" {
            "tool_use"
        } else {
            "end_turn"
        };
        events.push(SseEvent::named(
            "message_delta",
            json!({"type": "message_delta", "delta": {"stop_reason": stop_reason}}),
        ));
        events.push(SseEvent::named(
            "message_stop",
            json!({"type": "message_stop"}),
        ));
    }

    events
}

fn close_block(index: u32) -> SseEvent {
    SseEvent::named(
        "content_block_stop",
        json!({"type": "content_block_stop", "index": index}),
    )
}

/// Translates one Anthropic streaming event into zero or one OpenAI
/// chat-completion-chunk frame. The mirror of
/// [`openai_chat_delta_to_anthropic`], used when the client speaks OpenAI
/// Chat against an Anthropic-protocol target.
pub fn anthropic_event_to_openai_chat_delta(event: &SseEvent, state: &mut StreamBridgeState) -> Option<Json> {
    match event.name {
        Some("message_start") => {
            state.message_id = event
                .data
                .get("message")
                .and_then(|m| m.get("id"))
                .and_then(Value::as_str)
                .unwrap_or("chatcmpl_stream")
                .to_string();
            state.model = event
                .data
                .get("message")
                .and_then(|m| m.get("model"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            None
        }
        Some("content_block_delta") => {
            let text = event
                .data
                .get("delta")
                .and_then(|d| d.get("text"))
                .and_then(Value::as_str)?;
            Some(chat_chunk(state, json!({"content": text}), None))
        }
        Some("message_delta") => {
            let stop_reason = event
                .data
                .get("delta")
                .and_then(|d| d.get("stop_reason"))
                .and_then(Value::as_str);
            let finish_reason = match stop_reason {
                Some("tool_use") => "tool_calls",
                _ => "stop",
            };
            Some(chat_chunk(state, json!({}), Some(finish_reason)))
        }
        _ => None,
    }
}

fn chat_chunk(state: &StreamBridgeState, delta: Json, finish_reason: Option<&str>) -> Json {
    json!({
        "id": state.message_id,
        "object": "chat.completion.chunk",
        "model": state.model,
        "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_delta_opens_block_once() {
        let mut state = StreamBridgeState::default();
        let frame = json!({
            "id": "c1", "model": "glm-4",
            "choices": [{"index": 0, "delta": {"content": "pong"}, "finish_reason": Value::Null}]
        });
        let events = openai_chat_delta_to_anthropic(&frame, &mut state);
        let names: Vec<_> = events.iter().map(|e| e.name).collect();
        assert_eq!(names, vec![Some("message_start"), Some("content_block_start"), Some("content_block_delta")]);
    }

    #[test]
    fn finish_reason_closes_block_and_stops_message() {
        let mut state = StreamBridgeState::default();
        let _ = openai_chat_delta_to_anthropic(
            &json!({"id": "c1", "model": "glm-4", "choices": [{"index": 0, "delta": {"content": "pong"}}]}),
            &mut state,
        );
        let events = openai_chat_delta_to_anthropic(
            &json!({"id": "c1", "model": "glm-4", "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]}),
            &mut state,
        );
        let names: Vec<_> = events.iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            vec![Some("content_block_stop"), Some("message_delta"), Some("message_stop")]
        );
    }
}
