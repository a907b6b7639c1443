//! Streaming Handler (component C10): chooses passthrough vs synthesis
//! based on the pipeline result's shape, sets SSE headers, and guarantees
//! the `[DONE]`/`message_stop` invariant. Grounded in
//! `gproxy-core::proxy_engine::mod`'s `handle_stream_response` dispatch,
//! narrowed to the decision table spec.md §4.9 describes.

use routecodex_protocol::{Json, ProviderProtocol};

use crate::sse::{synthesize_anthropic, synthesize_openai_chat};

pub const SSE_CONTENT_TYPE: &str = "text/event-stream; charset=utf-8";
pub const SSE_CACHE_CONTROL: &str = "no-cache, no-transform";
pub const SSE_CONNECTION: &str = "keep-alive";

/// The headers set before any body byte is flushed, per spec.md §4.9 and
/// the `headers-before-body` invariant in spec.md §8.
pub fn sse_headers(request_id: &str) -> Vec<(&'static str, String)> {
    vec![
        ("content-type", SSE_CONTENT_TYPE.to_string()),
        ("cache-control", SSE_CACHE_CONTROL.to_string()),
        ("connection", SSE_CONNECTION.to_string()),
        ("x-request-id", request_id.to_string()),
    ]
}

/// Which SSE strategy applies to a buffered non-stream JSON result, per
/// spec.md §4.9's shape-matching rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisKind {
    OpenAiChat,
    Anthropic,
    RawFallback,
}

pub fn classify_for_synthesis(body: &Json, client_protocol: ProviderProtocol) -> SynthesisKind {
    let looks_like_chat = body.get("object").and_then(Json::as_str) == Some("chat.completion")
        || body.get("choices").and_then(Json::as_array).is_some();
    if looks_like_chat {
        return SynthesisKind::OpenAiChat;
    }
    if client_protocol == ProviderProtocol::Anthropic && body.get("content").and_then(Json::as_array).is_some() {
        return SynthesisKind::Anthropic;
    }
    SynthesisKind::RawFallback
}

/// Produces the full SSE frame sequence for a buffered JSON result,
/// including the terminal sentinel, per spec.md §4.9.
pub fn synthesize_frames(body: &Json, client_protocol: ProviderProtocol, synthetic_id: &str) -> Vec<String> {
    match classify_for_synthesis(body, client_protocol) {
        SynthesisKind::OpenAiChat => synthesize_openai_chat(body, synthetic_id),
        SynthesisKind::Anthropic => synthesize_anthropic(body),
        SynthesisKind::RawFallback => vec![
            format!("data: {}\n\n", body),
            "data: [DONE]\n\n".to_string(),
        ],
    }
}

/// A failure that occurs after headers were already flushed must become an
/// in-band error frame, never a second HTTP status, per spec.md §7.
pub fn error_frame(message: &str, error_type: &str, request_id: &str) -> String {
    let payload = serde_json::json!({
        "error": {"message": message, "type": error_type, "requestId": request_id}
    });
    format!("data: {}\n\ndata: [DONE]\n\n", payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_chat_completion_shape() {
        let body = json!({"object": "chat.completion", "choices": []});
        assert_eq!(
            classify_for_synthesis(&body, ProviderProtocol::OpenAiChat),
            SynthesisKind::OpenAiChat
        );
    }

    #[test]
    fn classifies_anthropic_shape_only_for_anthropic_clients() {
        let body = json!({"content": [{"type": "text", "text": "hi"}]});
        assert_eq!(
            classify_for_synthesis(&body, ProviderProtocol::Anthropic),
            SynthesisKind::Anthropic
        );
        assert_eq!(
            classify_for_synthesis(&body, ProviderProtocol::OpenAiChat),
            SynthesisKind::RawFallback
        );
    }

    #[test]
    fn error_frame_ends_with_done() {
        let frame = error_frame("boom", "network", "req-1");
        assert!(frame.ends_with("data: [DONE]\n\n"));
    }

    #[test]
    fn headers_include_request_id_and_sse_content_type() {
        let headers = sse_headers("req-9");
        assert!(headers.contains(&("content-type", SSE_CONTENT_TYPE.to_string())));
        assert!(headers.contains(&("x-request-id", "req-9".to_string())));
    }
}
