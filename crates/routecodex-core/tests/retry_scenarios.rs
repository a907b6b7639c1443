//! End-to-end coverage for spec.md §8's rate-limit-rotation and
//! series-cooldown scenarios, driven directly against the retry engine and
//! series cooldown registry rather than a running server.

use std::collections::HashMap;
use std::time::Duration;

use routecodex_common::{LimitsConfig, ModelSeries};
use routecodex_core::router::{select_next_candidate, RetryEngine, RetryLedger, RetryOutcome, SeriesCooldownRegistry};
use routecodex_provider_core::provider::{UnavailableDecision, UpstreamFailure};
use routecodex_provider_core::{CredentialPool, CredentialRecord, EventHub, UnavailableReason};

fn test_credential() -> CredentialRecord {
    CredentialRecord {
        access_token: "token".to_string(),
        refresh_token: None,
        expires_at: 0,
        api_key: None,
        created_at: 0,
    }
}

/// Scenario 3 (spec.md §8): a 429 from the first alias in a two-alias pool,
/// with a `quotaResetDelay: "15m"` body hint, cools that alias down for
/// 900 000 ms and rotates the same request to the next alias.
#[tokio::test]
async fn rate_limit_rotation_moves_to_next_alias() {
    let events = EventHub::new(16);
    let pool = CredentialPool::new(events.clone());
    pool.insert("iflow", "iflow.a".to_string(), test_credential()).await;
    pool.insert("iflow", "iflow.b".to_string(), test_credential()).await;
    let mut credentials = HashMap::new();
    credentials.insert("iflow".to_string(), pool);

    let cooldowns = SeriesCooldownRegistry::new(events);
    let limits = LimitsConfig::default();
    let engine = RetryEngine {
        limits: &limits,
        credentials: &credentials,
        cooldowns: &cooldowns,
    };

    let mut ledger = RetryLedger::new();
    let failure = UpstreamFailure::Http {
        status: 429,
        headers: vec![],
        body: bytes::Bytes::from_static(b"{\"quotaResetDelay\":\"15m\"}"),
    };
    let decision = Some(UnavailableDecision {
        duration: Duration::from_secs(900),
        reason: UnavailableReason::RateLimit,
    });

    let outcome = engine
        .apply_failure(&mut ledger, "iflow", "iflow.a", "glm-4", &failure, decision)
        .await;

    assert_eq!(outcome, RetryOutcome::Rotate);
    assert_eq!(ledger.attempts, 1);

    let candidates = vec!["iflow.a".to_string(), "iflow.b".to_string()];
    let provider_of = |candidate: &str| -> &str { candidate.split('.').next().unwrap() };
    let next = select_next_candidate(&candidates, &ledger, None, provider_of, &cooldowns).await;
    assert_eq!(next, Some("iflow.b"));

    let state = credentials
        .get("iflow")
        .unwrap()
        .state(&"iflow.a".to_string())
        .await
        .unwrap();
    assert!(!state.is_active());
}

/// Scenario 4 (spec.md §8): both aliases in the pool share the same series
/// (`gemini-pro`), so a series-level cooldown on the first failure blocks
/// rotation to the second alias entirely, for the rest of this request and
/// for any later request in the cooldown window.
#[tokio::test]
async fn series_cooldown_blocks_same_series_rotation() {
    let events = EventHub::new(16);
    let pool = CredentialPool::new(events.clone());
    pool.insert("antigravity", "antigravity.g-pro.k1".to_string(), test_credential())
        .await;
    pool.insert("antigravity", "antigravity.g-pro.k2".to_string(), test_credential())
        .await;
    let mut credentials = HashMap::new();
    credentials.insert("antigravity".to_string(), pool);

    let cooldowns = SeriesCooldownRegistry::new(events);
    let limits = LimitsConfig::default();
    let engine = RetryEngine {
        limits: &limits,
        credentials: &credentials,
        cooldowns: &cooldowns,
    };

    let mut ledger = RetryLedger::new();
    let failure = UpstreamFailure::Http {
        status: 429,
        headers: vec![],
        body: bytes::Bytes::from_static(b"{\"capacity exhausted\":true}"),
    };
    let decision = Some(UnavailableDecision {
        duration: Duration::from_secs(3600),
        reason: UnavailableReason::RateLimit,
    });

    let outcome = engine
        .apply_failure(
            &mut ledger,
            "antigravity",
            "antigravity.g-pro.k1",
            "gemini-1.5-pro",
            &failure,
            decision,
        )
        .await;
    assert_eq!(outcome, RetryOutcome::Rotate);
    assert_eq!(ledger.attempts, 1);

    let candidates = vec!["antigravity.g-pro.k1".to_string(), "antigravity.g-pro.k2".to_string()];
    let provider_of = |candidate: &str| -> &str { candidate.split('.').next().unwrap() };
    let next = select_next_candidate(
        &candidates,
        &ledger,
        Some(ModelSeries::GeminiPro),
        provider_of,
        &cooldowns,
    )
    .await;
    assert_eq!(next, None, "both aliases share the cooled-down series");

    assert!(cooldowns.is_cooled_down("antigravity", ModelSeries::GeminiPro).await);
}
