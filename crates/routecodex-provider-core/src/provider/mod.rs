use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use routecodex_protocol::{InboundRequest, Json, ProviderProtocol};

use crate::config::ProviderProfile;
use crate::headers::Headers;
use crate::{CredentialRecord, ProviderError, ProviderResult, UnavailableReason};

pub mod generic;
pub use generic::GenericHttpProvider;

pub type ByteStream = tokio::sync::mpsc::Receiver<Bytes>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn parse(method: &str) -> Option<Self> {
        if method.eq_ignore_ascii_case("GET") {
            Some(HttpMethod::Get)
        } else if method.eq_ignore_ascii_case("POST") {
            Some(HttpMethod::Post)
        } else if method.eq_ignore_ascii_case("PUT") {
            Some(HttpMethod::Put)
        } else if method.eq_ignore_ascii_case("PATCH") {
            Some(HttpMethod::Patch)
        } else if method.eq_ignore_ascii_case("DELETE") {
            Some(HttpMethod::Delete)
        } else {
            None
        }
    }
}

#[derive(Debug)]
pub enum UpstreamBody {
    Bytes(Bytes),
    Stream(ByteStream),
}

#[derive(Debug)]
pub struct UpstreamHttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: UpstreamBody,
}

#[derive(Debug, Clone)]
pub struct UpstreamHttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
    pub is_stream: bool,
}

/// Downstream request for provider-managed OAuth start.
#[derive(Debug, Clone)]
pub struct OAuthStartRequest {
    pub query: Option<String>,
    pub headers: Headers,
}

/// Downstream request for provider-managed OAuth callback.
#[derive(Debug, Clone)]
pub struct OAuthCallbackRequest {
    pub query: Option<String>,
    pub headers: Headers,
}

#[derive(Debug, Clone)]
pub struct OAuthCredential {
    pub name: Option<String>,
    pub settings_json: Option<Json>,
    pub credential: CredentialRecord,
}

#[derive(Debug)]
pub struct OAuthCallbackResult {
    pub response: UpstreamHttpResponse,
    pub credential: Option<OAuthCredential>,
}

/// Per-attempt context handed to a provider implementation when building
/// the outbound HTTP request. Carries no DB identifiers; tracing only.
#[derive(Debug, Clone)]
pub struct UpstreamCtx {
    pub trace_id: Option<String>,
    pub user_agent: Option<String>,
    pub outbound_proxy: Option<String>,
    pub provider_key: String,
    pub attempt_no: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UpstreamTransportErrorKind {
    Timeout,
    ReadTimeout,
    Connect,
    Dns,
    Tls,
    Other,
}

#[derive(Debug, Clone)]
pub enum UpstreamFailure {
    /// Transport-level failures (no HTTP response).
    Transport {
        kind: UpstreamTransportErrorKind,
        message: String,
    },
    /// HTTP error response captured as bytes (usually non-2xx).
    Http {
        status: u16,
        headers: Headers,
        body: Bytes,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnavailableDecision {
    pub duration: Duration,
    pub reason: UnavailableReason,
}

#[derive(Debug)]
pub enum AuthRetryAction {
    None,
    RetrySame,
    UpdateCredential(Box<CredentialRecord>),
}

const RATE_LIMIT_FALLBACK_SECS: u64 = 30;
const SHORT_COOLDOWN_SECS: u64 = 10;
const AUTH_INVALID_YEARS: u64 = 9_999;

pub fn default_decide_unavailable(failure: &UpstreamFailure) -> Option<UnavailableDecision> {
    match failure {
        UpstreamFailure::Http {
            status,
            headers,
            body,
        } => {
            if *status == 404 {
                return None;
            }
            if *status == 429 {
                let duration = quota_reset_duration(body)
                    .or_else(|| parse_retry_after(headers))
                    .unwrap_or_else(|| Duration::from_secs(RATE_LIMIT_FALLBACK_SECS));
                return Some(UnavailableDecision {
                    duration,
                    reason: UnavailableReason::RateLimit,
                });
            }
            if *status == 401 || *status == 403 {
                let duration = quota_reset_duration(body).unwrap_or_else(auth_invalid_duration);
                return Some(UnavailableDecision {
                    duration,
                    reason: UnavailableReason::AuthInvalid,
                });
            }
            if (500..600).contains(status) {
                return Some(UnavailableDecision {
                    duration: Duration::from_secs(SHORT_COOLDOWN_SECS),
                    reason: UnavailableReason::Upstream5xx,
                });
            }
            None
        }
        UpstreamFailure::Transport { kind, .. } => match kind {
            UpstreamTransportErrorKind::Timeout
            | UpstreamTransportErrorKind::ReadTimeout
            | UpstreamTransportErrorKind::Connect
            | UpstreamTransportErrorKind::Dns
            | UpstreamTransportErrorKind::Tls => Some(UnavailableDecision {
                duration: Duration::from_secs(SHORT_COOLDOWN_SECS),
                reason: UnavailableReason::Timeout,
            }),
            _ => None,
        },
    }
}

fn parse_retry_after(headers: &Headers) -> Option<Duration> {
    let value = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
        .map(|(_, value)| value.as_str())?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let secs = value.parse::<u64>().ok()?;
    Some(Duration::from_secs(secs))
}

fn auth_invalid_duration() -> Duration {
    Duration::from_secs(AUTH_INVALID_YEARS * 365 * 24 * 60 * 60)
}

/// Looks for `quotaResetDelay`/`quotaResetTimeStamp` anywhere in the error
/// body's top level or its nested `error` object, per spec's cooldown-hint
/// grammar. `quotaResetDelay` is a duration string parsed via
/// `routecodex_common::duration::parse_duration_hint`; `quotaResetTimeStamp`
/// is an absolute epoch-millisecond deadline, turned into a duration by
/// subtracting the current time (clamped to zero if already past).
fn quota_reset_duration(body: &Bytes) -> Option<Duration> {
    let value: Json = serde_json::from_slice(body).ok()?;
    if let Some(duration) = quota_reset_from_object(&value) {
        return Some(duration);
    }
    value.get("error").and_then(quota_reset_from_object)
}

fn quota_reset_from_object(value: &Json) -> Option<Duration> {
    if let Some(delay) = value.get("quotaResetDelay").and_then(Json::as_str)
        && let Some(duration) = routecodex_common::duration::parse_duration_hint(delay)
    {
        return Some(duration);
    }
    if let Some(timestamp_ms) = value.get("quotaResetTimeStamp").and_then(json_as_epoch_ms) {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let remaining_ms = (timestamp_ms - now_ms).max(0) as u64;
        return Some(Duration::from_millis(remaining_ms));
    }
    None
}

fn json_as_epoch_ms(value: &Json) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value.as_str()?.parse::<i64>().ok()
}

/// A provider implementation turns one normalized inbound request plus a
/// resolved profile and credential into a concrete outbound HTTP request.
/// Protocol-to-protocol conversion happens upstream of this trait (the
/// conversion codec facade); by the time `build_request` runs, `payload`
/// is already shaped for `profile.protocol`.
#[async_trait]
pub trait UpstreamProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn protocol(&self) -> ProviderProtocol;

    async fn build_request(
        &self,
        ctx: &UpstreamCtx,
        profile: &ProviderProfile,
        credential: &CredentialRecord,
        payload: &InboundRequest,
    ) -> ProviderResult<UpstreamHttpRequest>;

    /// Provider-managed OAuth start (downstream endpoint).
    fn oauth_start(
        &self,
        _ctx: &UpstreamCtx,
        _profile: &ProviderProfile,
        _req: &OAuthStartRequest,
    ) -> ProviderResult<UpstreamHttpResponse> {
        Err(ProviderError::Unsupported("oauth_start"))
    }

    /// Provider-managed OAuth callback (downstream endpoint).
    fn oauth_callback(
        &self,
        _ctx: &UpstreamCtx,
        _profile: &ProviderProfile,
        _req: &OAuthCallbackRequest,
    ) -> ProviderResult<OAuthCallbackResult> {
        Err(ProviderError::Unsupported("oauth_callback"))
    }

    /// Classify an upstream failure into a credential "unavailable" decision.
    fn decide_unavailable(
        &self,
        _ctx: &UpstreamCtx,
        _profile: &ProviderProfile,
        _credential: &CredentialRecord,
        failure: &UpstreamFailure,
    ) -> Option<UnavailableDecision> {
        default_decide_unavailable(failure)
    }

    fn on_auth_failure<'a>(
        &'a self,
        _ctx: &'a UpstreamCtx,
        _profile: &'a ProviderProfile,
        _credential: &'a CredentialRecord,
        _failure: &'a UpstreamFailure,
    ) -> Pin<Box<dyn Future<Output = ProviderResult<AuthRetryAction>> + Send + 'a>> {
        Box::pin(async { Ok(AuthRetryAction::None) })
    }

    /// Optional non-stream response normalization hook: providers can
    /// rewrite upstream JSON body shapes before the codec decodes them.
    fn normalize_nonstream_response(
        &self,
        _ctx: &UpstreamCtx,
        _profile: &ProviderProfile,
        _credential: &CredentialRecord,
        body: Bytes,
    ) -> ProviderResult<Bytes> {
        Ok(body)
    }
}
