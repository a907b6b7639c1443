//! Component C7 (Pipeline Orchestrator) plus the request/retry loop: this
//! is where the router (C8), invoker (C5), codec facade (C1), and
//! compatibility shaper (C6) actually get run in order for one inbound
//! request. There is no separate generic `Orchestrator` type — an earlier
//! closure/blueprint-based one in `routecodex-core::pipeline` was never
//! driven by anything, so it was deleted rather than kept as an unused
//! second implementation of the same ordering this function already
//! performs concretely. Grounded in `gproxy-core::proxy_engine::mod`'s
//! `handle_protocol` outer loop, restructured around the explicit
//! component boundaries this workspace keeps as separate crates.

use routecodex_codec::CodecContext;
use routecodex_common::classify_series;
use routecodex_core::pipeline::PipelineDto;
use routecodex_core::router::{select_next_candidate, RetryEngine, RetryLedger, RetryOutcome};
use routecodex_core::{invoker, resolve_pool_name, shaper};
use routecodex_protocol::{InboundRequest, Json, ProviderProtocol};
use routecodex_provider_core::provider::{UpstreamCtx, UpstreamFailure};
use routecodex_provider_core::{RouteEntry, RouteMetadata};

use crate::convert::{inbound_to_json, json_to_inbound};
use crate::error::GatewayError;
use crate::state::RouterState;

pub struct PipelineOutcome {
    pub status: u16,
    pub body: Json,
    pub client_protocol: ProviderProtocol,
    pub wants_stream: bool,
}

pub async fn run(
    state: &RouterState,
    entry_endpoint: &str,
    client_protocol: ProviderProtocol,
    inbound: InboundRequest,
    request_id: String,
    explicit_route: Option<&str>,
) -> Result<PipelineOutcome, GatewayError> {
    let config = state.config.load();
    let model_id = inbound.model().to_string();
    let wants_stream = inbound.wants_stream();
    let model_series = classify_series(&model_id);

    let pool_name = resolve_pool_name(&config.routes, explicit_route, &model_id);
    let pool = config.routes.pool(pool_name).ok_or(GatewayError::NoPool)?.to_vec();

    let mut dto = PipelineDto::new(request_id.clone(), entry_endpoint, client_protocol, inbound.clone());
    let mut ledger = RetryLedger::new();

    loop {
        let provider_of = |candidate: &str| -> &str {
            route_entry_for(&config.routes, candidate)
                .map(|entry| entry.provider_id.as_str())
                .unwrap_or(candidate)
        };
        let Some(candidate) = select_next_candidate(&pool, &ledger, model_series, provider_of, &state.cooldowns).await
        else {
            return Err(GatewayError::PoolExhausted);
        };
        let candidate = candidate.to_string();

        let Some(entry) = route_entry_for(&config.routes, &candidate) else {
            ledger.tried.push(candidate);
            continue;
        };
        let Some(profile) = config.provider(&entry.provider_id) else {
            ledger.tried.push(candidate);
            continue;
        };
        let Some(provider) = state.providers.get(&entry.provider_id) else {
            ledger.tried.push(candidate);
            continue;
        };
        let Some(credential_pool) = state.credentials.get(&entry.provider_id) else {
            ledger.tried.push(candidate);
            continue;
        };
        let Ok((_credential_id, credential)) = credential_pool.acquire(&entry.provider_id).await else {
            ledger.tried.push(candidate);
            continue;
        };

        let resolved_model = if entry.model_id.is_empty() {
            model_id.clone()
        } else {
            entry.model_id.clone()
        };
        dto.bind_target(entry.provider_id.clone(), candidate.clone(), resolved_model);

        let request_json = inbound_to_json(&inbound)?;
        let codec_ctx = CodecContext::new(request_id.clone(), entry_endpoint, client_protocol, entry.provider_protocol);
        let converted = state
            .codec
            .convert_request(request_json, &codec_ctx)
            .map_err(|err| GatewayError::Conversion(err.to_string()))?;
        let shaped = shape_request(state, &entry.provider_id, converted);
        let target_inbound = json_to_inbound(entry.provider_protocol, shaped)?;

        let ctx = UpstreamCtx {
            trace_id: Some(request_id.clone()),
            user_agent: None,
            outbound_proxy: None,
            provider_key: candidate.clone(),
            attempt_no: ledger.attempts + 1,
        };

        let attempt = state
            .invoker
            .invoke(provider.as_ref(), &ctx, profile, &credential, &target_inbound)
            .await;

        let response = match attempt {
            Ok(response) if (200..300).contains(&response.status) => response,
            Ok(response) => {
                let body = invoker::buffer_body(response.body).await;
                let failure = UpstreamFailure::Http {
                    status: response.status,
                    headers: response.headers,
                    body,
                };
                let decision = provider.decide_unavailable(&ctx, profile, &credential, &failure);
                let retry_engine = RetryEngine {
                    limits: &config.limits,
                    credentials: state.credentials.as_ref(),
                    cooldowns: &state.cooldowns,
                };
                let outcome = retry_engine
                    .apply_failure(&mut ledger, &entry.provider_id, &candidate, &model_id, &failure, decision)
                    .await;
                if outcome == RetryOutcome::Rotate {
                    continue;
                }
                return Err(GatewayError::Upstream(failure_message(&failure)));
            }
            Err(failure) => {
                let decision = provider.decide_unavailable(&ctx, profile, &credential, &failure);
                let retry_engine = RetryEngine {
                    limits: &config.limits,
                    credentials: state.credentials.as_ref(),
                    cooldowns: &state.cooldowns,
                };
                let outcome = retry_engine
                    .apply_failure(&mut ledger, &entry.provider_id, &candidate, &model_id, &failure, decision)
                    .await;
                if outcome == RetryOutcome::Rotate {
                    continue;
                }
                return Err(GatewayError::Upstream(failure_message(&failure)));
            }
        };

        let body_bytes = invoker::buffer_body(response.body).await;
        let upstream_json: Json = serde_json::from_slice(&body_bytes).unwrap_or(Json::Null);
        let shaped_response = shape_response(state, &entry.provider_id, upstream_json);
        let client_json = state
            .codec
            .convert_response(shaped_response, &codec_ctx)
            .map_err(|err| GatewayError::Conversion(err.to_string()))?;

        return Ok(PipelineOutcome {
            status: response.status,
            body: client_json,
            client_protocol,
            wants_stream,
        });
    }
}

fn route_entry_for<'a>(routes: &'a RouteMetadata, provider_key: &str) -> Option<&'a RouteEntry> {
    routes.routes.values().find(|entry| entry.provider_key == provider_key)
}

/// Applies the provider's declarative shape bundle, then its named request
/// hook, if any, per spec.md §4.7. Providers without a bundle or hook pass
/// the payload through untouched.
fn shape_request(state: &RouterState, provider_id: &str, mut json: Json) -> Json {
    if let Some(bundle) = state.shapers.get(provider_id) {
        bundle.apply(&mut json);
    }
    if provider_id.contains("iflow")
        && let Some(tools) = json.get_mut("tools")
    {
        shaper::iflow_shape_tool_functions(tools);
    }
    json
}

fn shape_response(state: &RouterState, provider_id: &str, mut json: Json) -> Json {
    if let Some(bundle) = state.shapers.get(provider_id) {
        bundle.apply(&mut json);
    }
    if provider_id.contains("glm") || provider_id.contains("iflow") {
        shaper::normalize_glm_usage(&mut json);
    }
    json
}

fn failure_message(failure: &UpstreamFailure) -> String {
    match failure {
        UpstreamFailure::Transport { message, .. } => message.clone(),
        UpstreamFailure::Http { status, body, .. } => {
            format!("http {status}: {}", String::from_utf8_lossy(body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_entry_lookup_matches_by_provider_key() {
        let mut routes = RouteMetadata::default();
        routes.routes.insert(
            "pipeline-1".to_string(),
            RouteEntry {
                provider_id: "glm".to_string(),
                provider_key: "glm.k1".to_string(),
                model_id: String::new(),
                provider_protocol: ProviderProtocol::OpenAiChat,
                entry_endpoints: vec!["/v1/chat/completions".to_string()],
                process_mode: routecodex_provider_core::ProcessMode::Both,
                streaming: routecodex_provider_core::StreamingPolicy::Auto,
            },
        );
        let entry = route_entry_for(&routes, "glm.k1").unwrap();
        assert_eq!(entry.provider_id, "glm");
    }
}
