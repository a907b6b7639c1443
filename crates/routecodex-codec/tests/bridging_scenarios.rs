//! Scenario 6 from spec.md §8: an Anthropic-shaped inbound request routed
//! to an OpenAI-Chat target, including a `tool_use` block, bridged through
//! `CodecFacade` in both directions.

use routecodex_codec::{CodecContext, CodecFacade};
use routecodex_protocol::ProviderProtocol;
use serde_json::json;

#[test]
fn anthropic_tool_use_request_and_response_bridge_through_openai_chat() {
    let facade = CodecFacade::new();
    let ctx = CodecContext::new("req-6", "/v1/messages", ProviderProtocol::Anthropic, ProviderProtocol::OpenAiChat);

    let inbound = json!({
        "model": "claude-3-opus",
        "max_tokens": 256,
        "messages": [{
            "role": "assistant",
            "content": [{"type": "tool_use", "id": "t1", "name": "shell", "input": {"command": "ls"}}],
        }],
    });

    let openai_request = facade.convert_request(inbound, &ctx).unwrap();
    assert_eq!(openai_request["model"], "claude-3-opus");
    let tool_call = &openai_request["messages"][0]["tool_calls"][0];
    assert_eq!(tool_call["type"], "function");
    assert_eq!(tool_call["function"]["name"], "shell");

    // Upstream (OpenAI-Chat shaped, non-stream) answers with its own tool call.
    let upstream_response = json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "gpt-4.1",
        "choices": [{
            "index": 0,
            "finish_reason": "tool_calls",
            "message": {
                "role": "assistant",
                "tool_calls": [{"id": "t1", "function": {"name": "shell", "arguments": "{\"command\":\"ls\"}"}}],
            },
        }],
    });

    let anthropic_response = facade.convert_response(upstream_response, &ctx).unwrap();
    assert_eq!(anthropic_response["stop_reason"], "tool_use");
    assert_eq!(anthropic_response["content"][0]["type"], "tool_use");
    assert_eq!(anthropic_response["content"][0]["name"], "shell");
    assert_eq!(anthropic_response["content"][0]["input"]["command"], "ls");
}
