//! Front-door-local helpers moving between the neutral `Json` tree the
//! codec facade operates on and the tagged `InboundRequest` enum. The
//! provider invoker builds its outbound HTTP request from an
//! `InboundRequest` shaped for the target protocol, so a converted `Json`
//! payload is re-wrapped here before being handed to `UpstreamProvider`.

use routecodex_protocol::anthropic::MessagesRequest;
use routecodex_protocol::openai_chat::ChatCompletionRequest;
use routecodex_protocol::openai_responses::ResponsesRequest;
use routecodex_protocol::{InboundRequest, Json, ProviderProtocol};

use crate::error::GatewayError;

/// The body shape a non-passthrough entry endpoint deserializes to, before
/// it's wrapped in [`InboundRequest`]'s tag.
pub fn inbound_to_json(inbound: &InboundRequest) -> Result<Json, GatewayError> {
    let value = match inbound {
        InboundRequest::OpenAiChat(req) => serde_json::to_value(req),
        InboundRequest::OpenAiResponses(req) => serde_json::to_value(req),
        InboundRequest::Anthropic(req) => serde_json::to_value(req),
        InboundRequest::SubmitToolOutputs { body, .. } => serde_json::to_value(body),
    };
    value.map_err(|err| GatewayError::BadRequest(err.to_string()))
}

/// Re-wraps a `Json` tree already shaped for `target_protocol` into the
/// matching `InboundRequest` variant.
pub fn json_to_inbound(target_protocol: ProviderProtocol, json: Json) -> Result<InboundRequest, GatewayError> {
    match target_protocol {
        ProviderProtocol::OpenAiChat => serde_json::from_value::<ChatCompletionRequest>(json)
            .map(InboundRequest::OpenAiChat)
            .map_err(|err| GatewayError::Conversion(err.to_string())),
        ProviderProtocol::OpenAiResponses => serde_json::from_value::<ResponsesRequest>(json)
            .map(InboundRequest::OpenAiResponses)
            .map_err(|err| GatewayError::Conversion(err.to_string())),
        ProviderProtocol::Anthropic => serde_json::from_value::<MessagesRequest>(json)
            .map(InboundRequest::Anthropic)
            .map_err(|err| GatewayError::Conversion(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_openai_chat_through_json() {
        let inbound = InboundRequest::OpenAiChat(ChatCompletionRequest {
            model: "glm-4".to_string(),
            messages: vec![],
            stream: false,
            temperature: None,
            max_tokens: None,
            tools: None,
            tool_choice: None,
            extra: serde_json::json!({}),
        });
        let json = inbound_to_json(&inbound).unwrap();
        let back = json_to_inbound(ProviderProtocol::OpenAiChat, json).unwrap();
        assert_eq!(back.model(), "glm-4");
    }
}
