//! Scenario 2 from spec.md §8 (synthesis of SSE from a buffered non-stream
//! JSON response), exercised directly against the streaming substrate.

use routecodex_core::streaming::{sse_headers, synthesize_frames};
use routecodex_protocol::ProviderProtocol;
use serde_json::json;

#[test]
fn synthesizes_sse_from_buffered_chat_completion() {
    let upstream = json!({
        "id": "c1",
        "object": "chat.completion",
        "model": "glm-4",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "message": {"role": "assistant", "content": "pong"},
        }],
        "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2},
    });

    let frames = synthesize_frames(&upstream, ProviderProtocol::OpenAiChat, "syn_1");

    // Exactly one [DONE], and it is the last frame.
    let done_count = frames.iter().filter(|f| f.as_str() == "data: [DONE]\n\n").count();
    assert_eq!(done_count, 1);
    assert_eq!(frames.last().map(String::as_str), Some("data: [DONE]\n\n"));

    assert!(frames[0].starts_with("data: "));
    assert!(frames[0].contains("\"content\":\"pong\""));
    assert!(frames[0].contains("\"finish_reason\":null"));

    let final_chunk = &frames[frames.len() - 2];
    assert!(final_chunk.contains("\"id\":\"syn_1_end\""));
    assert!(final_chunk.contains("\"finish_reason\":\"stop\""));
}

#[test]
fn headers_precede_body_for_every_stream() {
    let headers = sse_headers("req-7");
    assert!(headers
        .iter()
        .any(|(name, value)| *name == "content-type" && value.starts_with("text/event-stream")));
    assert!(headers.iter().any(|(name, value)| *name == "x-request-id" && value == "req-7"));
}
