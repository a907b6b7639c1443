//! Pipeline DTO (component C2): the in-flight envelope carrying payload,
//! route decision, and metadata through the orchestrator. Grounded in
//! spec.md §3's duck-typed `{data, metadata, route}` envelope, modeled here
//! as an explicit struct per spec.md §9's re-architecture guidance (model
//! duck-typed envelopes as an explicit struct with optional fields).

use std::collections::HashMap;
use std::time::SystemTime;

use bytes::Bytes;
use routecodex_protocol::{InboundRequest, Json, ProviderProtocol};

/// A concrete target binding: which provider, credential alias, and model
/// this request is currently bound to.
#[derive(Debug, Clone)]
pub struct RouteBinding {
    pub provider_id: String,
    pub provider_key: String,
    pub model_id: String,
    pub request_id: String,
    pub timestamp: SystemTime,
    pub pipeline_id: String,
}

/// Either a structured JSON payload or an opaque stream handle. The SSE
/// substrate (C9) is the only component that unwraps `Stream`.
pub enum PipelineData {
    Json(Json),
    Stream(tokio::sync::mpsc::Receiver<Bytes>),
    /// The original, not-yet-converted inbound request (request phase,
    /// before C1 has run).
    Inbound(InboundRequest),
}

impl std::fmt::Debug for PipelineData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineData::Json(json) => f.debug_tuple("Json").field(json).finish(),
            PipelineData::Stream(_) => f.debug_tuple("Stream").field(&"<handle>").finish(),
            PipelineData::Inbound(req) => f.debug_tuple("Inbound").field(req).finish(),
        }
    }
}

/// Per-stage debug snapshot opt-in.
#[derive(Debug, Clone, Default)]
pub struct DebugStages {
    pub llm_switch: bool,
    pub workflow: bool,
    pub compatibility: bool,
    pub provider: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DebugOptions {
    pub enabled: bool,
    pub stages: DebugStages,
}

/// The unit of work flowing through the orchestrator.
pub struct PipelineDto {
    pub data: PipelineData,
    pub route: RouteBinding,
    pub metadata: HashMap<String, Json>,
    pub debug: DebugOptions,
    /// Client-facing protocol; set once from the entry endpoint and never
    /// changed for the lifetime of the DTO.
    pub client_protocol: ProviderProtocol,
    /// Current target protocol; changes when the router rotates to a
    /// target speaking a different wire protocol.
    pub target_protocol: ProviderProtocol,
}

impl PipelineDto {
    pub fn new(
        request_id: impl Into<String>,
        entry_endpoint: impl Into<String>,
        client_protocol: ProviderProtocol,
        inbound: InboundRequest,
    ) -> Self {
        let request_id = request_id.into();
        let mut metadata = HashMap::new();
        metadata.insert(
            "entryEndpoint".to_string(),
            Json::String(entry_endpoint.into()),
        );
        metadata.insert("requestId".to_string(), Json::String(request_id.clone()));
        metadata.insert(
            "stream".to_string(),
            Json::Bool(inbound.wants_stream()),
        );

        Self {
            data: PipelineData::Inbound(inbound),
            route: RouteBinding {
                provider_id: String::new(),
                provider_key: String::new(),
                model_id: String::new(),
                request_id,
                timestamp: SystemTime::now(),
                pipeline_id: String::new(),
            },
            metadata,
            debug: DebugOptions::default(),
            client_protocol,
            target_protocol: client_protocol,
        }
    }

    pub fn entry_endpoint(&self) -> Option<&str> {
        match self.metadata.get("entryEndpoint") {
            Some(Json::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn wants_stream(&self) -> bool {
        matches!(self.metadata.get("stream"), Some(Json::Bool(true)))
    }

    pub fn bind_target(&mut self, provider_id: String, provider_key: String, model_id: String) {
        self.route.provider_id = provider_id;
        self.route.provider_key = provider_key;
        self.route.model_id = model_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routecodex_protocol::openai_chat::ChatCompletionRequest;

    fn sample_inbound() -> InboundRequest {
        InboundRequest::OpenAiChat(ChatCompletionRequest {
            model: "glm-4".to_string(),
            messages: vec![],
            stream: false,
            temperature: None,
            max_tokens: None,
            tools: None,
            tool_choice: None,
            extra: serde_json::json!({}),
        })
    }

    #[test]
    fn request_id_is_stable_and_entry_endpoint_is_set_up_front() {
        let dto = PipelineDto::new(
            "req-1",
            "/v1/chat/completions",
            ProviderProtocol::OpenAiChat,
            sample_inbound(),
        );
        assert_eq!(dto.route.request_id, "req-1");
        assert_eq!(dto.entry_endpoint(), Some("/v1/chat/completions"));
        assert!(!dto.wants_stream());
    }
}
