use std::collections::HashMap;

use routecodex_protocol::{Json, ProviderProtocol};

/// Carried alongside a payload through a single conversion call. Mirrors
/// the DTO's `requestId`/`entryEndpoint`/metadata so codecs never need a
/// reference back into the pipeline DTO itself.
#[derive(Debug, Clone)]
pub struct CodecContext {
    pub request_id: String,
    pub entry_endpoint: String,
    /// The protocol the payload is currently shaped as (the client's, for
    /// a request conversion; the provider's, for a response conversion).
    pub client_protocol: ProviderProtocol,
    /// The protocol the payload must end up shaped as.
    pub target_protocol: ProviderProtocol,
    pub metadata: HashMap<String, Json>,
}

impl CodecContext {
    pub fn new(
        request_id: impl Into<String>,
        entry_endpoint: impl Into<String>,
        client_protocol: ProviderProtocol,
        target_protocol: ProviderProtocol,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            entry_endpoint: entry_endpoint.into(),
            client_protocol,
            target_protocol,
            metadata: HashMap::new(),
        }
    }

    /// The inverse context, used when running the response-phase
    /// conversion back from the provider's shape to the client's.
    pub fn reversed(&self) -> Self {
        Self {
            request_id: self.request_id.clone(),
            entry_endpoint: self.entry_endpoint.clone(),
            client_protocol: self.target_protocol,
            target_protocol: self.client_protocol,
            metadata: self.metadata.clone(),
        }
    }
}
