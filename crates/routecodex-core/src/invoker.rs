//! Provider Invoker (component C5): executes exactly one upstream call.
//! Binds a credential, builds the provider-specific request, calls C4, and
//! normalizes the outcome. Retry/rotation across attempts is the router's
//! job (C8); this module only knows about a single attempt, plus the
//! same-target retry-once path for an invalid OAuth token. Grounded in
//! `gproxy-core::proxy_engine::mod`'s per-attempt body inside
//! `handle_protocol` (acquire → build → send → classify auth failure →
//! maybe retry once).

use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use routecodex_protocol::InboundRequest;
use routecodex_provider_core::provider::{AuthRetryAction, UpstreamCtx, UpstreamFailure, UpstreamHttpResponse};
use routecodex_provider_core::{CredentialRecord, Event, EventHub, ProviderProfile, UpstreamEvent, UpstreamProvider};

use crate::transport::UpstreamClient;

/// Error classes surfaced through the structured provider-error event,
/// per spec.md §4.6 step 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorCode {
    Compatibility,
    ProviderFailure,
    PipelineFailure,
}

impl ProviderErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderErrorCode::Compatibility => "ERR_COMPATIBILITY",
            ProviderErrorCode::ProviderFailure => "ERR_PROVIDER_FAILURE",
            ProviderErrorCode::PipelineFailure => "ERR_PIPELINE_FAILURE",
        }
    }
}

pub struct Invoker {
    transport: Arc<dyn UpstreamClient>,
    events: EventHub,
}

impl Invoker {
    pub fn new(transport: Arc<dyn UpstreamClient>, events: EventHub) -> Self {
        Self { transport, events }
    }

    /// Runs one attempt against `profile` using `credential`. On an
    /// upstream-invalid-token signal, refreshes via `provider.on_auth_failure`
    /// and retries once on the same target before giving up, matching
    /// spec.md §4.6 step 4.
    pub async fn invoke(
        &self,
        provider: &dyn UpstreamProvider,
        ctx: &UpstreamCtx,
        profile: &ProviderProfile,
        credential: &CredentialRecord,
        payload: &InboundRequest,
    ) -> Result<UpstreamHttpResponse, UpstreamFailure> {
        let request = provider
            .build_request(ctx, profile, credential, payload)
            .await
            .map_err(|err| UpstreamFailure::Transport {
                kind: routecodex_provider_core::provider::UpstreamTransportErrorKind::Other,
                message: err.to_string(),
            })?;

        let attempt = self.send_and_log(provider, ctx, profile, credential, request.clone()).await;

        let Err(failure) = &attempt else {
            return attempt;
        };

        let action = provider.on_auth_failure(ctx, profile, credential, failure).await;
        match action {
            Ok(AuthRetryAction::RetrySame) => self.send_and_log(provider, ctx, profile, credential, request).await,
            Ok(AuthRetryAction::UpdateCredential(updated)) => {
                let refreshed_request = provider
                    .build_request(ctx, profile, &updated, payload)
                    .await
                    .map_err(|err| UpstreamFailure::Transport {
                        kind: routecodex_provider_core::provider::UpstreamTransportErrorKind::Other,
                        message: err.to_string(),
                    })?;
                self.send_and_log(provider, ctx, profile, &updated, refreshed_request).await
            }
            _ => attempt,
        }
    }

    async fn send_and_log(
        &self,
        provider: &dyn UpstreamProvider,
        ctx: &UpstreamCtx,
        profile: &ProviderProfile,
        credential: &CredentialRecord,
        request: routecodex_provider_core::UpstreamHttpRequest,
    ) -> Result<UpstreamHttpResponse, UpstreamFailure> {
        let request_method = request.method.as_str().to_string();
        let request_headers = request.headers.clone();
        let request_url = request.url.clone();
        let request_body = request.body.as_ref().map(|b| b.to_vec());

        let result = self.transport.send(request).await;

        let (response_status, response_headers, response_body, error_kind, error_message, transport_kind) = match &result {
            Ok(response) => {
                let body_snapshot = match &response.body {
                    routecodex_provider_core::UpstreamBody::Bytes(bytes) => Some(bytes.to_vec()),
                    routecodex_provider_core::UpstreamBody::Stream(_) => None,
                };
                (Some(response.status), response.headers.clone(), body_snapshot, None, None, None)
            }
            Err(UpstreamFailure::Http { status, headers, body }) => {
                (Some(*status), headers.clone(), Some(body.to_vec()), Some("http".to_string()), None, None)
            }
            Err(UpstreamFailure::Transport { kind, message }) => {
                (None, Vec::new(), None, Some("transport".to_string()), Some(message.clone()), Some(*kind))
            }
        };

        self.events
            .emit(Event::Upstream(UpstreamEvent {
                trace_id: ctx.trace_id.clone(),
                at: SystemTime::now(),
                provider: provider.name().to_string(),
                credential_id: Some(ctx.provider_key.clone()),
                attempt_no: ctx.attempt_no,
                operation: profile.protocol.as_str().to_string(),
                request_method,
                request_headers,
                request_path: request_url,
                request_query: None,
                request_body: request_body.filter(|_| should_log_body(credential)),
                response_status,
                response_headers,
                response_body,
                error_kind,
                error_message,
                transport_kind,
            }))
            .await;

        result
    }
}

fn should_log_body(_credential: &CredentialRecord) -> bool {
    // Body snapshots never carry the bearer token itself, but keep the hook
    // explicit so a future redaction policy has one place to land.
    true
}

/// Buffers a response body into `Bytes`, regardless of whether it arrived
/// as a single chunk or a stream — used by the orchestrator's non-stream
/// response path.
pub async fn buffer_body(body: routecodex_provider_core::UpstreamBody) -> Bytes {
    match body {
        routecodex_provider_core::UpstreamBody::Bytes(bytes) => bytes,
        routecodex_provider_core::UpstreamBody::Stream(mut rx) => {
            let mut buf = Vec::new();
            while let Some(chunk) = rx.recv().await {
                buf.extend_from_slice(&chunk);
            }
            Bytes::from(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_render_spec_names() {
        assert_eq!(ProviderErrorCode::Compatibility.as_str(), "ERR_COMPATIBILITY");
        assert_eq!(ProviderErrorCode::ProviderFailure.as_str(), "ERR_PROVIDER_FAILURE");
        assert_eq!(ProviderErrorCode::PipelineFailure.as_str(), "ERR_PIPELINE_FAILURE");
    }
}
