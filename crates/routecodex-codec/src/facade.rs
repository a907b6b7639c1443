use routecodex_protocol::{Json, ProviderProtocol};

use crate::{
    AnthropicOpenAiCodec, CodecContext, CodecError, ConversionCodec, PassthroughCodec,
    ResponsesOpenAiCodec,
};

/// Holds no state of its own beyond the three concrete codecs; dispatches
/// by `(client_protocol, target_protocol)`.
#[derive(Debug, Default)]
pub struct CodecFacade {
    anthropic_openai: AnthropicOpenAiCodec,
    responses_openai: ResponsesOpenAiCodec,
    passthrough: PassthroughCodec,
}

impl CodecFacade {
    pub fn new() -> Self {
        Self::default()
    }

    fn codec_for(
        &self,
        client_protocol: ProviderProtocol,
        target_protocol: ProviderProtocol,
    ) -> Option<&dyn ConversionCodec> {
        if client_protocol == target_protocol {
            return Some(&self.passthrough);
        }
        use ProviderProtocol::*;
        match (client_protocol, target_protocol) {
            (Anthropic, OpenAiChat) | (OpenAiChat, Anthropic) => Some(&self.anthropic_openai),
            (OpenAiResponses, OpenAiChat) | (OpenAiChat, OpenAiResponses) => {
                Some(&self.responses_openai)
            }
            _ => None,
        }
    }

    pub fn convert_request(&self, payload: Json, ctx: &CodecContext) -> Result<Json, CodecError> {
        self.codec_for(ctx.client_protocol, ctx.target_protocol)
            .ok_or_else(|| no_codec(ctx.client_protocol, ctx.target_protocol))?
            .convert_request(payload, ctx)
    }

    pub fn convert_response(&self, payload: Json, ctx: &CodecContext) -> Result<Json, CodecError> {
        self.codec_for(ctx.client_protocol, ctx.target_protocol)
            .ok_or_else(|| no_codec(ctx.client_protocol, ctx.target_protocol))?
            .convert_response(payload, ctx)
    }
}

fn no_codec(client_protocol: ProviderProtocol, target_protocol: ProviderProtocol) -> CodecError {
    CodecError::root(format!(
        "no codec registered for {client_protocol} -> {target_protocol}; route through openai-chat as a pivot instead"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picks_passthrough_for_identical_protocols() {
        let facade = CodecFacade::new();
        let ctx = CodecContext::new("r1", "/v1/chat/completions", ProviderProtocol::OpenAiChat, ProviderProtocol::OpenAiChat);
        let payload = json!({"model": "glm-4"});
        assert_eq!(facade.convert_request(payload.clone(), &ctx).unwrap(), payload);
    }

    #[test]
    fn rejects_unrouted_protocol_pair() {
        let facade = CodecFacade::new();
        let ctx = CodecContext::new("r1", "/v1/messages", ProviderProtocol::Anthropic, ProviderProtocol::OpenAiResponses);
        assert!(facade.convert_request(json!({}), &ctx).is_err());
    }
}
