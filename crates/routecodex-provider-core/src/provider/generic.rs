//! A config-driven `UpstreamProvider` for profiles that speak a plain
//! OpenAI-compatible (or Anthropic-compatible) HTTP API with either no
//! auth, a static API key, or OAuth2 refresh-token auth. One instance,
//! registered under every provider id that doesn't need bespoke request
//! shaping, matching the shape of `gproxy-provider-impl`'s per-vendor
//! providers but collapsed to the fields `ProviderProfile`/`AuthConfig`
//! already carry.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use routecodex_protocol::{InboundRequest, ProviderProtocol};

use crate::config::{AuthConfig, ProviderProfile};
use crate::errors::{OAuthError, ProviderError, ProviderResult};
use crate::oauth::{EnsureValidOptions, OAuthLifecycleManager, OAuthProvider};
use crate::provider::{
    AuthRetryAction, HttpMethod, UpstreamCtx, UpstreamFailure, UpstreamHttpRequest,
};
use crate::{CredentialRecord, UpstreamProvider};

pub struct GenericHttpProvider {
    oauth: OAuthLifecycleManager,
}

impl GenericHttpProvider {
    pub fn new() -> Self {
        Self {
            oauth: OAuthLifecycleManager::new(),
        }
    }
}

impl Default for GenericHttpProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn default_endpoint(protocol: ProviderProtocol) -> &'static str {
    match protocol {
        ProviderProtocol::OpenAiChat => "/chat/completions",
        ProviderProtocol::OpenAiResponses => "/responses",
        ProviderProtocol::Anthropic => "/v1/messages",
    }
}

/// Forces `stream: false` in the outbound body regardless of what the
/// client asked for: the router always buffers the upstream response
/// (`invoker::buffer_body`) and synthesizes SSE client-side from it, so
/// asking the upstream itself to stream would hand that buffering step a
/// raw SSE byte stream it can't JSON-parse. `SubmitToolOutputsRequest` has
/// no `stream` field to clear — that endpoint has no non-streaming variant
/// upstream, a known gap tracked in DESIGN.md.
fn request_body(payload: &InboundRequest) -> ProviderResult<Bytes> {
    let value = match payload {
        InboundRequest::OpenAiChat(req) => {
            let mut req = req.clone();
            req.stream = false;
            serde_json::to_vec(&req)
        }
        InboundRequest::OpenAiResponses(req) => {
            let mut req = req.clone();
            req.stream = false;
            serde_json::to_vec(&req)
        }
        InboundRequest::Anthropic(req) => {
            let mut req = req.clone();
            req.stream = false;
            serde_json::to_vec(&req)
        }
        InboundRequest::SubmitToolOutputs { body, .. } => serde_json::to_vec(body),
    };
    value
        .map(Bytes::from)
        .map_err(|err| ProviderError::Other(err.to_string()))
}

fn request_path(profile: &ProviderProfile, payload: &InboundRequest) -> String {
    if let InboundRequest::SubmitToolOutputs { response_id, .. } = payload {
        return format!("/responses/{response_id}/submit_tool_outputs");
    }
    profile
        .transport
        .endpoint
        .clone()
        .unwrap_or_else(|| default_endpoint(profile.protocol).to_string())
}

#[async_trait]
impl UpstreamProvider for GenericHttpProvider {
    fn name(&self) -> &'static str {
        "generic-http"
    }

    fn protocol(&self) -> ProviderProtocol {
        ProviderProtocol::OpenAiChat
    }

    async fn build_request(
        &self,
        _ctx: &UpstreamCtx,
        profile: &ProviderProfile,
        credential: &CredentialRecord,
        payload: &InboundRequest,
    ) -> ProviderResult<UpstreamHttpRequest> {
        let path = request_path(profile, payload);
        let url = format!("{}{}", profile.transport.base_url.trim_end_matches('/'), path);
        let accept = if payload.wants_stream() { "text/event-stream" } else { "application/json" };
        let mut headers: Vec<(String, String)> = vec![
            ("content-type".to_string(), "application/json".to_string()),
            ("accept".to_string(), accept.to_string()),
        ];

        if let Some(extra) = &profile.transport.headers {
            for (k, v) in extra {
                headers.push((k.clone(), v.clone()));
            }
        }

        // Spec step 1: ask C3 for a valid credential before building the
        // request, rather than waiting for a 401 to trigger refresh.
        let active_credential = if let AuthConfig::OAuth { token_file, client_id, client_secret, token_url, .. } = &profile.auth {
            let refresher = Oauth2RefreshProvider {
                provider_family: profile.provider_id.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                token_url: token_url.clone(),
            };
            match self.oauth.ensure_valid(&profile.provider_id, token_file, &refresher, EnsureValidOptions::default()).await {
                Ok(fresh) => fresh,
                Err(_) => credential.clone(),
            }
        } else {
            credential.clone()
        };

        match &profile.auth {
            AuthConfig::None => {}
            AuthConfig::ApiKey { .. } | AuthConfig::OAuth { .. } => {
                if profile.protocol == ProviderProtocol::Anthropic {
                    headers.push(("x-api-key".to_string(), active_credential.bearer_value().to_string()));
                    headers.push(("anthropic-version".to_string(), "2023-06-01".to_string()));
                } else {
                    headers.push(("authorization".to_string(), format!("Bearer {}", active_credential.bearer_value())));
                }
            }
        }

        Ok(UpstreamHttpRequest {
            method: HttpMethod::Post,
            url,
            headers,
            body: Some(request_body(payload)?),
            // See `request_body`'s doc comment: the outbound body already
            // asks for a non-streaming response, so the transport never
            // needs to open a live `UpstreamBody::Stream` channel either.
            is_stream: false,
        })
    }

    fn decide_unavailable(
        &self,
        _ctx: &UpstreamCtx,
        _profile: &ProviderProfile,
        _credential: &CredentialRecord,
        failure: &UpstreamFailure,
    ) -> Option<crate::provider::UnavailableDecision> {
        crate::provider::default_decide_unavailable(failure)
    }

    fn on_auth_failure<'a>(
        &'a self,
        _ctx: &'a UpstreamCtx,
        profile: &'a ProviderProfile,
        credential: &'a CredentialRecord,
        failure: &'a UpstreamFailure,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ProviderResult<AuthRetryAction>> + Send + 'a>> {
        Box::pin(async move {
            let AuthConfig::OAuth { token_file, client_id, client_secret, token_url, .. } = &profile.auth else {
                return Ok(AuthRetryAction::None);
            };
            let message = match failure {
                UpstreamFailure::Http { status, .. } => format!("http {status}"),
                UpstreamFailure::Transport { message, .. } => message.clone(),
            };
            let refresher = Oauth2RefreshProvider {
                provider_family: profile.provider_id.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                token_url: token_url.clone(),
            };
            let retried = self
                .oauth
                .handle_upstream_invalid(&profile.provider_id, token_file, &refresher, &message)
                .await;
            if !retried {
                return Ok(AuthRetryAction::None);
            }
            let refreshed = self
                .oauth
                .ensure_valid(&profile.provider_id, token_file, &refresher, EnsureValidOptions::default())
                .await
                .map_err(|err| ProviderError::Other(err.to_string()))?;
            let _ = credential;
            Ok(AuthRetryAction::UpdateCredential(Box::new(refreshed)))
        })
    }
}

struct Oauth2RefreshProvider {
    provider_family: String,
    client_id: String,
    client_secret: Option<String>,
    token_url: String,
}

#[derive(serde::Serialize)]
struct RefreshRequestBody<'a> {
    client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
    grant_type: &'a str,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponseBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[async_trait]
impl OAuthProvider for Oauth2RefreshProvider {
    fn provider_family(&self) -> &str {
        &self.provider_family
    }

    async fn refresh(&self, record: &CredentialRecord) -> Result<CredentialRecord, OAuthError> {
        let refresh_token = record
            .refresh_token
            .as_deref()
            .ok_or_else(|| OAuthError::RefreshFailed("no refresh_token on record".to_string()))?;

        let body = RefreshRequestBody {
            client_id: &self.client_id,
            client_secret: self.client_secret.as_deref(),
            grant_type: "refresh_token",
            refresh_token,
        };

        let client = wreq::Client::new();
        let response = client
            .post(&self.token_url)
            .json(&body)
            .send()
            .await
            .map_err(|err| OAuthError::RefreshFailed(err.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::RefreshFailed(format!("http {}", response.status())));
        }

        let parsed: RefreshResponseBody = response
            .json()
            .await
            .map_err(|err| OAuthError::RefreshFailed(err.to_string()))?;

        let now_ms = now_epoch_ms();
        Ok(CredentialRecord {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token.or_else(|| record.refresh_token.clone()),
            expires_at: now_ms + parsed.expires_in.unwrap_or(3600) * 1000,
            api_key: record.api_key.clone(),
            created_at: record.created_at,
        })
    }

    /// First-time authorization-code/device-code acquisition is out of
    /// scope for this gateway: it has no browser to open and no device
    /// pairing surface, so refresh-token rotation (`refresh`, above) is
    /// the only token lifecycle this provider implements. Operators seed
    /// the initial `CredentialRecord` (refresh token included) out of
    /// band before startup; `OAuthLifecycleManager` only ever needs to
    /// fall back to `interactive` when that seed is missing or its
    /// refresh token has been revoked, which this gateway treats as a
    /// configuration error rather than something to recover from live.
    async fn interactive(&self) -> Result<CredentialRecord, OAuthError> {
        Err(OAuthError::InteractiveRequired)
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderMetadata, TransportConfig};

    fn profile(auth: AuthConfig, protocol: ProviderProtocol) -> ProviderProfile {
        ProviderProfile {
            provider_id: "glm".to_string(),
            protocol,
            transport: TransportConfig {
                base_url: "https://api.example.com".to_string(),
                endpoint: None,
                timeout_ms: 1000,
                max_retries: 0,
                headers: None,
            },
            auth,
            compatibility_profile: None,
            metadata: ProviderMetadata::default(),
        }
    }

    #[tokio::test]
    async fn build_request_sets_bearer_header_for_openai_chat() {
        let provider = GenericHttpProvider::new();
        let profile = profile(
            AuthConfig::ApiKey { value: Some("k".to_string()), env_ref: None, secret_ref: None },
            ProviderProtocol::OpenAiChat,
        );
        let credential = CredentialRecord {
            access_token: String::new(),
            refresh_token: None,
            expires_at: 0,
            api_key: Some("sk-test".to_string()),
            created_at: 0,
        };
        let payload = InboundRequest::OpenAiChat(routecodex_protocol::openai_chat::ChatCompletionRequest {
            model: "glm-4".to_string(),
            messages: vec![],
            stream: false,
            temperature: None,
            max_tokens: None,
            tools: None,
            tool_choice: None,
            extra: serde_json::json!({}),
        });
        let ctx = UpstreamCtx {
            trace_id: None,
            user_agent: None,
            outbound_proxy: None,
            provider_key: "glm.k1".to_string(),
            attempt_no: 1,
        };
        let request = provider.build_request(&ctx, &profile, &credential, &payload).await.unwrap();
        assert_eq!(request.url, "https://api.example.com/chat/completions");
        assert!(request.headers.iter().any(|(k, v)| k == "authorization" && v == "Bearer sk-test"));
    }

    #[tokio::test]
    async fn build_request_uses_api_key_header_for_anthropic() {
        let provider = GenericHttpProvider::new();
        let profile = profile(
            AuthConfig::ApiKey { value: Some("k".to_string()), env_ref: None, secret_ref: None },
            ProviderProtocol::Anthropic,
        );
        let credential = CredentialRecord {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at: 0,
            api_key: None,
            created_at: 0,
        };
        let payload = InboundRequest::Anthropic(routecodex_protocol::anthropic::MessagesRequest {
            model: "claude-3-opus".to_string(),
            messages: vec![],
            stream: false,
            max_tokens: 1024,
            system: None,
            tools: None,
            tool_choice: None,
            extra: serde_json::json!({}),
        });
        let ctx = UpstreamCtx {
            trace_id: None,
            user_agent: None,
            outbound_proxy: None,
            provider_key: "anthropic.k1".to_string(),
            attempt_no: 1,
        };
        let request = provider.build_request(&ctx, &profile, &credential, &payload).await.unwrap();
        assert!(request.headers.iter().any(|(k, v)| k == "x-api-key" && v == "tok"));
        assert!(request.headers.iter().any(|(k, _)| k == "anthropic-version"));
    }
}
