use serde::{Deserialize, Serialize};

use crate::anthropic::MessagesRequest;
use crate::openai_chat::ChatCompletionRequest;
use crate::openai_responses::{ResponsesRequest, SubmitToolOutputsRequest};

/// The three (four, counting tool-output submission) shapes a request can
/// arrive in, tagged by which entry endpoint accepted it. Replaces the
/// open-world "any" body the front door would otherwise hand to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InboundRequest {
    OpenAiChat(ChatCompletionRequest),
    OpenAiResponses(ResponsesRequest),
    SubmitToolOutputs {
        response_id: String,
        body: SubmitToolOutputsRequest,
    },
    Anthropic(MessagesRequest),
}

impl InboundRequest {
    /// The wire model name requested by the client, used by the router's
    /// pool classifier.
    pub fn model(&self) -> &str {
        match self {
            InboundRequest::OpenAiChat(req) => &req.model,
            InboundRequest::OpenAiResponses(req) => &req.model,
            InboundRequest::SubmitToolOutputs { .. } => "",
            InboundRequest::Anthropic(req) => &req.model,
        }
    }

    /// Whether the client asked for a streamed response. Tool-output
    /// submission always streams per the spec's entry-endpoint table.
    pub fn wants_stream(&self) -> bool {
        match self {
            InboundRequest::OpenAiChat(req) => req.stream,
            InboundRequest::OpenAiResponses(req) => req.stream,
            InboundRequest::SubmitToolOutputs { .. } => true,
            InboundRequest::Anthropic(req) => req.stream,
        }
    }

    pub fn provider_protocol(&self) -> &'static str {
        match self {
            InboundRequest::OpenAiChat(_) => "openai-chat",
            InboundRequest::OpenAiResponses(_) | InboundRequest::SubmitToolOutputs { .. } => {
                "openai-responses"
            }
            InboundRequest::Anthropic(_) => "anthropic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_tool_outputs_always_streams() {
        let request = InboundRequest::SubmitToolOutputs {
            response_id: "resp_1".to_string(),
            body: SubmitToolOutputsRequest {
                tool_outputs: vec![],
            },
        };
        assert!(request.wants_stream());
        assert_eq!(request.provider_protocol(), "openai-responses");
    }
}
