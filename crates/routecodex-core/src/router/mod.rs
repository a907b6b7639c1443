//! Virtual Router + Retry Engine (component C8): resolves a route pool to a
//! concrete provider target, rotates among candidates on failure,
//! classifies upstream errors, and enforces per-request attempt caps and
//! per-series cooldowns. Grounded in `gproxy-core::proxy_engine::mod`'s
//! attempt loop (`handle_protocol`'s acquire/build/send/classify/rotate
//! cycle), restructured around an explicit per-request `RetryLedger`
//! instead of a loop-local tally.

pub mod series_cooldown;

use std::collections::HashMap;
use std::time::Duration;

use routecodex_common::{classify_series, LimitsConfig, ModelSeries};
use routecodex_provider_core::config::RouteMetadata;
use routecodex_provider_core::provider::{UnavailableDecision, UpstreamFailure, UpstreamTransportErrorKind};
use routecodex_provider_core::{CredentialPool, UnavailableReason};

pub use series_cooldown::SeriesCooldownRegistry;

/// How the retry engine classifies a single attempt's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Non-recoverable; surface to the client as-is.
    TerminalFatal,
    /// Handled entirely inside C4 (exponential backoff on the same target);
    /// invisible to the router by the time it sees the failure.
    TransportRetryable,
    /// Rotate to the next candidate in the pool, no cooldown attached.
    RotateToNext,
    /// Attach a cooldown (credential- or series-scoped) and rotate.
    CooldownThenRotate,
}

/// Per-request retry bookkeeping (spec.md §3 `RetryLedger`). Created at
/// orchestrator entry, destroyed when the request completes.
#[derive(Debug, Default)]
pub struct RetryLedger {
    pub tried: Vec<String>,
    pub attempts: u32,
    last_error_signature: Option<String>,
    consecutive_same_error: u32,
    pub last_rotation_reason: Option<String>,
}

const CONSECUTIVE_SAME_ERROR_LIMIT: u32 = 3;

impl RetryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&mut self, provider_key: &str, error_signature: Option<&str>) {
        self.attempts += 1;
        self.tried.push(provider_key.to_string());
        match (error_signature, &self.last_error_signature) {
            (Some(sig), Some(last)) if sig == last => self.consecutive_same_error += 1,
            (Some(sig), _) => {
                self.last_error_signature = Some(sig.to_string());
                self.consecutive_same_error = 1;
            }
            (None, _) => {
                self.last_error_signature = None;
                self.consecutive_same_error = 0;
            }
        }
    }

    /// When the same failure signature repeats this many times, every
    /// alias in the pool is treated as exhausted rather than rotating
    /// through them one at a time.
    pub fn should_avoid_all_aliases(&self) -> bool {
        self.consecutive_same_error >= CONSECUTIVE_SAME_ERROR_LIMIT
    }

    pub fn has_tried(&self, provider_key: &str) -> bool {
        self.tried.iter().any(|k| k == provider_key)
    }
}

/// Classifies an upstream failure per spec.md §4.3's taxonomy. `series` is
/// the model series of the target that just failed, if classifiable. Status
/// code alone decides transport/5xx/429 outcomes; 400/401/403 additionally
/// inspect the body for the context-overflow and OAuth-reauth-vs-
/// verification-required hints spec.md names explicitly, the same
/// substring-matching approach `oauth::looks_like_invalid_token` already
/// uses for upstream-invalid-token detection.
pub fn classify_failure(failure: &UpstreamFailure, decision: Option<UnavailableDecision>) -> ErrorClass {
    match failure {
        UpstreamFailure::Transport { kind, .. } => match kind {
            UpstreamTransportErrorKind::Timeout
            | UpstreamTransportErrorKind::ReadTimeout
            | UpstreamTransportErrorKind::Connect
            | UpstreamTransportErrorKind::Dns
            | UpstreamTransportErrorKind::Tls => ErrorClass::TransportRetryable,
            UpstreamTransportErrorKind::Other => ErrorClass::TerminalFatal,
        },
        UpstreamFailure::Http { status, body, .. } => {
            let text = body_text(body);
            if has_cooldown_hint(&text) {
                return ErrorClass::CooldownThenRotate;
            }
            if *status == 429 {
                return ErrorClass::CooldownThenRotate;
            }
            if *status == 400 {
                return if looks_like_context_overflow(&text) {
                    ErrorClass::RotateToNext
                } else {
                    ErrorClass::TerminalFatal
                };
            }
            if *status == 403 {
                return if looks_like_verification_required(&text) {
                    ErrorClass::TerminalFatal
                } else {
                    ErrorClass::RotateToNext
                };
            }
            if *status == 401 {
                return ErrorClass::RotateToNext;
            }
            if (500..600).contains(status) {
                return decision
                    .map(|_| ErrorClass::CooldownThenRotate)
                    .unwrap_or(ErrorClass::RotateToNext);
            }
            ErrorClass::TerminalFatal
        }
    }
}

fn body_text(body: &bytes::Bytes) -> String {
    String::from_utf8_lossy(body).to_ascii_lowercase()
}

/// `quotaResetDelay`/`quotaResetTimeStamp` presence or capacity/resource
/// exhausted phrasing, per spec.md §4.3's cooldown bucket.
fn has_cooldown_hint(text: &str) -> bool {
    text.contains("quotaresetdelay")
        || text.contains("quotaresettimestamp")
        || text.contains("capacity exhausted")
        || text.contains("capacity_exhausted")
        || text.contains("resource exhausted")
        || text.contains("resource_exhausted")
}

fn looks_like_context_overflow(text: &str) -> bool {
    text.contains("prompt too long")
        || text.contains("context_length_exceeded")
        || text.contains("context length exceeded")
        || text.contains("maximum context length")
        || text.contains("too many tokens")
}

fn looks_like_verification_required(text: &str) -> bool {
    text.contains("verify your account")
}

/// Resolves which pool a DTO routes through: an explicit route name, a
/// model-classifier pool, or `default`, per spec.md §4.3.
pub fn resolve_pool_name<'a>(routes: &'a RouteMetadata, explicit_route: Option<&'a str>, model_id: &str) -> &'a str {
    if let Some(name) = explicit_route
        && routes.pool(name).is_some()
    {
        return name;
    }
    if let Some(series) = classify_series(model_id) {
        let pool_name = match series {
            ModelSeries::Claude => "claude",
            ModelSeries::GeminiPro => "gemini-pro",
            ModelSeries::GeminiFlash => "gemini-flash",
        };
        if routes.pool(pool_name).is_some() {
            return pool_name;
        }
    }
    "default"
}

/// Selects the next candidate from `pool`, skipping keys already tried this
/// request and keys whose series is currently cooled down for their
/// provider. Candidates are otherwise tried in pool (LRU) order.
pub async fn select_next_candidate<'a>(
    pool: &'a [String],
    ledger: &RetryLedger,
    model_series: Option<ModelSeries>,
    provider_of: impl Fn(&str) -> &'a str,
    cooldowns: &SeriesCooldownRegistry,
) -> Option<&'a str> {
    for candidate in pool {
        if ledger.has_tried(candidate) {
            continue;
        }
        if let Some(series) = model_series {
            let provider_id = provider_of(candidate);
            if cooldowns.is_cooled_down(provider_id, series).await {
                continue;
            }
        }
        return Some(candidate.as_str());
    }
    None
}

/// The per-request object the orchestrator hands invocation results to.
/// Wraps the credential pool, the series-cooldown registry, and limits
/// needed to make a rotate/retry/fail decision.
pub struct RetryEngine<'a> {
    pub limits: &'a LimitsConfig,
    pub credentials: &'a HashMap<String, CredentialPool>,
    pub cooldowns: &'a SeriesCooldownRegistry,
}

impl<'a> RetryEngine<'a> {
    /// Applies a classified failure: marks the credential (and/or series)
    /// unavailable as appropriate, then reports whether the request should
    /// keep retrying.
    pub async fn apply_failure(
        &self,
        ledger: &mut RetryLedger,
        provider_id: &str,
        provider_key: &str,
        model_id: &str,
        failure: &UpstreamFailure,
        decision: Option<UnavailableDecision>,
    ) -> RetryOutcome {
        let signature = failure_signature(failure);
        ledger.record_attempt(provider_key, Some(&signature));

        let class = classify_failure(failure, decision);
        if let Some(decision) = decision
            && class == ErrorClass::CooldownThenRotate
        {
            if let Some(pool) = self.credentials.get(provider_id) {
                pool.mark_unavailable(provider_key.to_string(), decision.duration, decision.reason)
                    .await;
            }
            if let Some(series) = classify_series(model_id) {
                self.cooldowns
                    .start_cooldown(provider_id, series, decision.duration, decision.reason)
                    .await;
            }
        }

        if ledger.attempts >= self.limits.attempt_cap_for(provider_key) {
            return RetryOutcome::AttemptCapReached;
        }
        if ledger.should_avoid_all_aliases() {
            return RetryOutcome::AvoidAllAliases;
        }

        match class {
            ErrorClass::TerminalFatal => RetryOutcome::TerminalFail,
            ErrorClass::TransportRetryable | ErrorClass::RotateToNext | ErrorClass::CooldownThenRotate => {
                RetryOutcome::Rotate
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Rotate,
    TerminalFail,
    AttemptCapReached,
    AvoidAllAliases,
}

fn failure_signature(failure: &UpstreamFailure) -> String {
    match failure {
        UpstreamFailure::Transport { kind, .. } => format!("transport:{kind:?}"),
        UpstreamFailure::Http { status, .. } => format!("http:{status}"),
    }
}

/// Placeholder cooldown duration for an HTTP failure lacking a
/// `decide_unavailable` hint (e.g. a provider implementation that returns
/// `None`); kept small and explicit rather than silently skipping cooldown.
pub fn fallback_cooldown() -> Duration {
    Duration::from_secs(30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_tracks_consecutive_same_error() {
        let mut ledger = RetryLedger::new();
        ledger.record_attempt("a", Some("http:429"));
        ledger.record_attempt("b", Some("http:429"));
        ledger.record_attempt("c", Some("http:429"));
        assert!(ledger.should_avoid_all_aliases());
    }

    #[test]
    fn ledger_resets_on_different_error() {
        let mut ledger = RetryLedger::new();
        ledger.record_attempt("a", Some("http:429"));
        ledger.record_attempt("b", Some("http:500"));
        assert!(!ledger.should_avoid_all_aliases());
    }

    #[test]
    fn classify_429_is_cooldown_then_rotate() {
        let failure = UpstreamFailure::Http {
            status: 429,
            headers: vec![],
            body: bytes::Bytes::new(),
        };
        assert_eq!(classify_failure(&failure, None), ErrorClass::CooldownThenRotate);
    }

    #[test]
    fn classify_400_context_overflow_rotates_instead_of_terminal() {
        let failure = UpstreamFailure::Http {
            status: 400,
            headers: vec![],
            body: bytes::Bytes::from_static(b"{\"error\":\"prompt too long for this model\"}"),
        };
        assert_eq!(classify_failure(&failure, None), ErrorClass::RotateToNext);
    }

    #[test]
    fn classify_400_without_overflow_hint_is_terminal() {
        let failure = UpstreamFailure::Http {
            status: 400,
            headers: vec![],
            body: bytes::Bytes::from_static(b"{\"error\":\"missing required field\"}"),
        };
        assert_eq!(classify_failure(&failure, None), ErrorClass::TerminalFatal);
    }

    #[test]
    fn classify_403_verification_required_is_terminal() {
        let failure = UpstreamFailure::Http {
            status: 403,
            headers: vec![],
            body: bytes::Bytes::from_static(b"{\"error\":\"please verify your account to continue\"}"),
        };
        assert_eq!(classify_failure(&failure, None), ErrorClass::TerminalFatal);
    }

    #[test]
    fn classify_403_reauth_hint_rotates() {
        let failure = UpstreamFailure::Http {
            status: 403,
            headers: vec![],
            body: bytes::Bytes::from_static(b"{\"error\":\"token expired, please reauthenticate\"}"),
        };
        assert_eq!(classify_failure(&failure, None), ErrorClass::RotateToNext);
    }

    #[test]
    fn classify_429_with_capacity_phrase_is_still_cooldown() {
        let failure = UpstreamFailure::Http {
            status: 429,
            headers: vec![],
            body: bytes::Bytes::from_static(b"{\"error\":\"capacity exhausted, retry later\"}"),
        };
        assert_eq!(classify_failure(&failure, None), ErrorClass::CooldownThenRotate);
    }

    #[test]
    fn classify_404_is_terminal() {
        let failure = UpstreamFailure::Http {
            status: 404,
            headers: vec![],
            body: bytes::Bytes::new(),
        };
        assert_eq!(classify_failure(&failure, None), ErrorClass::TerminalFatal);
    }

    #[test]
    fn pool_resolution_prefers_explicit_route() {
        let mut routes = RouteMetadata::default();
        routes.pools.insert("coding".to_string(), vec!["glm.a".to_string()]);
        routes.pools.insert("default".to_string(), vec!["glm.b".to_string()]);
        assert_eq!(resolve_pool_name(&routes, Some("coding"), "glm-4"), "coding");
        assert_eq!(resolve_pool_name(&routes, Some("missing"), "claude-3-opus"), "default");
    }
}
