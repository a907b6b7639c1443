//! SSE Substrate (component C9): passthrough of upstream streams, synthesis
//! of SSE from non-stream JSON, and cross-protocol stream transformation.
//! Grounded in spec.md §4.8's enumerated rules and
//! `gproxy-core::proxy_engine::{handle_stream_response, handle_stream_to_nonstream,
//! handle_nonstream_to_stream}`; cross-protocol frame translation itself is
//! delegated to `routecodex_codec::stream`.

use bytes::Bytes;
use routecodex_protocol::Json;
use serde_json::json;

pub const DONE: &str = "data: [DONE]\n\n";

/// One outbound SSE frame, already formatted for the wire.
pub fn format_data_frame(payload: &Json) -> String {
    format!("data: {}\n\n", payload)
}

pub fn format_named_frame(name: &str, payload: &Json) -> String {
    format!("event: {name}\ndata: {}\n\n", payload)
}

/// Synthesizes an OpenAI-Chat SSE sequence from a non-stream
/// `chat.completion` response, per spec.md §4.8: content segmented into
/// ≤200-char chunks, then a tool_calls chunk if present, then a final chunk
/// carrying `finish_reason`, then `[DONE]`.
pub fn synthesize_openai_chat(response: &Json, synthetic_id: &str) -> Vec<String> {
    const CHUNK_LEN: usize = 200;
    let mut frames = Vec::new();

    let model = response.get("model").and_then(Json::as_str).unwrap_or_default();
    let choice = response.get("choices").and_then(Json::as_array).and_then(|c| c.first());

    let Some(choice) = choice else {
        frames.push(format_data_frame(&final_chunk(synthetic_id, model, "stop")));
        frames.push(DONE.to_string());
        return frames;
    };

    let message = choice.get("message");
    let content = message
        .and_then(|m| m.get("content"))
        .and_then(Json::as_str)
        .unwrap_or_default();
    let tool_calls = message.and_then(|m| m.get("tool_calls")).and_then(Json::as_array);
    let original_finish = choice
        .get("finish_reason")
        .and_then(Json::as_str)
        .unwrap_or("stop");

    for chunk in chunk_str(content, CHUNK_LEN) {
        frames.push(format_data_frame(&json!({
            "id": synthetic_id,
            "object": "chat.completion.chunk",
            "model": model,
            "choices": [{"index": 0, "delta": {"content": chunk}, "finish_reason": Json::Null}],
        })));
    }

    let finish_reason = if tool_calls.is_some_and(|c| !c.is_empty()) {
        if let Some(calls) = tool_calls {
            frames.push(format_data_frame(&json!({
                "id": synthetic_id,
                "object": "chat.completion.chunk",
                "model": model,
                "choices": [{"index": 0, "delta": {"tool_calls": [calls[0].clone()]}, "finish_reason": Json::Null}],
            })));
        }
        "tool_calls"
    } else {
        original_finish
    };

    frames.push(format_data_frame(&final_chunk(synthetic_id, model, finish_reason)));
    frames.push(DONE.to_string());
    frames
}

fn final_chunk(synthetic_id: &str, model: &str, finish_reason: &str) -> Json {
    json!({
        "id": format!("{synthetic_id}_end"),
        "object": "chat.completion.chunk",
        "model": model,
        "choices": [{"index": 0, "delta": {}, "finish_reason": finish_reason}],
    })
}

fn chunk_str(content: &str, max_len: usize) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    content
        .chars()
        .collect::<Vec<_>>()
        .chunks(max_len)
        .map(|c| c.iter().collect())
        .collect()
}

/// Synthesizes an Anthropic Messages SSE sequence from a non-stream
/// `message` response: `message_start`, per-content-block lifecycle events,
/// `message_delta` with a mapped `stop_reason`, then `message_stop`.
pub fn synthesize_anthropic(response: &Json) -> Vec<String> {
    let mut frames = Vec::new();
    let message_id = response.get("id").and_then(Json::as_str).unwrap_or("msg_syn");
    let model = response.get("model").and_then(Json::as_str).unwrap_or_default();

    frames.push(format_named_frame(
        "message_start",
        &json!({
            "type": "message_start",
            "message": {"id": message_id, "type": "message", "role": "assistant", "model": model, "content": []},
        }),
    ));

    let blocks = response.get("content").and_then(Json::as_array).cloned().unwrap_or_default();
    for (index, block) in blocks.iter().enumerate() {
        let block_type = block.get("type").and_then(Json::as_str).unwrap_or("text");
        frames.push(format_named_frame(
            "content_block_start",
            &json!({"type": "content_block_start", "index": index, "content_block": block}),
        ));
        if block_type == "text"
            && let Some(text) = block.get("text").and_then(Json::as_str)
        {
            frames.push(format_named_frame(
                "content_block_delta",
                &json!({"type": "content_block_delta", "index": index, "delta": {"type": "text_delta", "text": text}}),
            ));
        }
        frames.push(format_named_frame(
            "content_block_stop",
            &json!({"type": "content_block_stop", "index": index}),
        ));
    }

    let stop_reason = response
        .get("stop_reason")
        .and_then(Json::as_str)
        .unwrap_or("end_turn");
    frames.push(format_named_frame(
        "message_delta",
        &json!({"type": "message_delta", "delta": {"stop_reason": stop_reason}}),
    ));
    frames.push(format_named_frame("message_stop", &json!({"type": "message_stop"})));
    frames
}

/// Lazily tracks the latest observed `finish_reason` across a byte stream
/// being relayed passthrough, per spec.md §4.8's finish-reason tracker.
/// Frame boundary is `\n\n`; non-JSON `data:` lines are ignored.
#[derive(Debug, Default)]
pub struct FinishReasonTracker {
    buffer: String,
    latest: Option<String>,
}

impl FinishReasonTracker {
    pub fn observe(&mut self, chunk: &Bytes) {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        while let Some(pos) = self.buffer.find("\n\n") {
            let frame = self.buffer[..pos].to_string();
            self.buffer.drain(..pos + 2);
            self.observe_frame(&frame);
        }
    }

    fn observe_frame(&mut self, frame: &str) {
        for line in frame.lines() {
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                continue;
            }
            let Ok(value) = serde_json::from_str::<Json>(data) else {
                continue;
            };
            if let Some(reason) = value
                .get("choices")
                .and_then(Json::as_array)
                .and_then(|c| c.first())
                .and_then(|c| c.get("finish_reason"))
                .and_then(Json::as_str)
            {
                self.latest = Some(reason.to_string());
            }
        }
    }

    pub fn latest(&self) -> Option<&str> {
        self.latest.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_choices_emits_one_stop_chunk() {
        let response = json!({"choices": []});
        let frames = synthesize_openai_chat(&response, "syn_1");
        assert_eq!(frames.len(), 2);
        assert!(frames[0].contains("\"finish_reason\":\"stop\""));
        assert_eq!(frames[1], DONE);
    }

    #[test]
    fn content_is_chunked_and_terminated_with_done() {
        let response = json!({
            "model": "glm-4",
            "choices": [{"index": 0, "finish_reason": "stop", "message": {"role": "assistant", "content": "pong"}}],
        });
        let frames = synthesize_openai_chat(&response, "syn_2");
        assert_eq!(frames.last().unwrap(), DONE);
        assert_eq!(frames.iter().filter(|f| **f == DONE).count(), 1);
    }

    #[test]
    fn tool_calls_flip_finish_reason() {
        let response = json!({
            "model": "glm-4",
            "choices": [{"index": 0, "finish_reason": "stop", "message": {
                "role": "assistant", "content": "", "tool_calls": [{"id": "call_1", "function": {"name": "x", "arguments": "{}"}}]
            }}],
        });
        let frames = synthesize_openai_chat(&response, "syn_3");
        let final_frame = &frames[frames.len() - 2];
        assert!(final_frame.contains("\"finish_reason\":\"tool_calls\""));
    }

    #[test]
    fn anthropic_synthesis_closes_every_block_and_stops_once() {
        let response = json!({
            "id": "msg_1",
            "model": "claude-3-opus",
            "stop_reason": "tool_use",
            "content": [{"type": "tool_use", "id": "t1", "name": "shell", "input": {}}],
        });
        let frames = synthesize_anthropic(&response);
        assert_eq!(frames.iter().filter(|f| f.starts_with("event: message_stop")).count(), 1);
        assert!(frames.last().unwrap().starts_with("event: message_stop"));
    }

    #[test]
    fn finish_reason_tracker_ignores_non_json_and_done() {
        let mut tracker = FinishReasonTracker::default();
        tracker.observe(&Bytes::from_static(b"data: [DONE]\n\n"));
        assert_eq!(tracker.latest(), None);
        tracker.observe(&Bytes::from_static(
            b"data: {\"choices\":[{\"finish_reason\":\"stop\"}]}\n\n",
        ));
        assert_eq!(tracker.latest(), Some("stop"));
    }
}
