//! OAuth lifecycle manager (component C3): keeps one on-disk
//! `CredentialRecord` per `(providerType, tokenFile)` fresh, single-flighting
//! concurrent callers and throttling repeated runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::credential::CredentialRecord;
use crate::errors::OAuthError;

const FRESHNESS_SKEW_MS: i64 = 60_000;
const THROTTLE: Duration = Duration::from_secs(60);

/// Per-provider hooks the manager calls into; providers implement token
/// refresh and interactive acquisition, the manager owns the bookkeeping
/// (freshness checks, single-flight, throttling, on-disk persistence).
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Provider family used for the field-requirement check (`iflow`, `qwen`, ...).
    fn provider_family(&self) -> &str;

    async fn refresh(&self, record: &CredentialRecord) -> Result<CredentialRecord, OAuthError>;

    async fn interactive(&self) -> Result<CredentialRecord, OAuthError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnsureValidOptions {
    pub force_reauth: bool,
    pub force_reacquire_if_refresh_fails: bool,
}

type FlightKey = (String, String);

#[derive(Default)]
pub struct OAuthLifecycleManager {
    inflight: Mutex<HashMap<FlightKey, Arc<Notify>>>,
    last_success: Mutex<HashMap<FlightKey, Instant>>,
}

impl OAuthLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ensure_valid(
        &self,
        provider_type: &str,
        token_file: &str,
        provider: &dyn OAuthProvider,
        opts: EnsureValidOptions,
    ) -> Result<CredentialRecord, OAuthError> {
        let key: FlightKey = (provider_type.to_string(), token_file.to_string());

        if !opts.force_reauth
            && let Some(last) = self.last_success.lock().await.get(&key).copied()
            && last.elapsed() < THROTTLE
            && let Ok(record) = read_record(token_file).await
            && is_fresh(&record, provider.provider_family())
        {
            return Ok(record);
        }

        loop {
            let notify = {
                let mut guard = self.inflight.lock().await;
                if let Some(existing) = guard.get(&key) {
                    Some(existing.clone())
                } else {
                    guard.insert(key.clone(), Arc::new(Notify::new()));
                    None
                }
            };
            if let Some(notify) = notify {
                notify.notified().await;
                continue;
            }
            break;
        }

        let result = self.ensure_valid_inner(token_file, provider, opts).await;

        if result.is_ok() {
            self.last_success
                .lock()
                .await
                .insert(key.clone(), Instant::now());
        }

        if let Some(notify) = self.inflight.lock().await.remove(&key) {
            notify.notify_waiters();
        }

        result
    }

    async fn ensure_valid_inner(
        &self,
        token_file: &str,
        provider: &dyn OAuthProvider,
        opts: EnsureValidOptions,
    ) -> Result<CredentialRecord, OAuthError> {
        let existing = read_record(token_file).await;

        if !opts.force_reauth
            && let Ok(record) = &existing
            && is_fresh(record, provider.provider_family())
        {
            return Ok(record.clone());
        }

        if let Ok(record) = &existing
            && record.refresh_token.is_some()
        {
            match provider.refresh(record).await {
                Ok(refreshed) => {
                    write_record(token_file, &refreshed).await?;
                    return Ok(refreshed);
                }
                Err(err) if !opts.force_reacquire_if_refresh_fails => return Err(err),
                Err(_) => {}
            }
        }

        let acquired = provider.interactive().await?;
        write_record(token_file, &acquired).await?;
        Ok(acquired)
    }

    /// Invalid-token recovery: callers pass the upstream error message.
    /// Returns whether the caller should retry against the same target.
    pub async fn handle_upstream_invalid(
        &self,
        provider_type: &str,
        token_file: &str,
        provider: &dyn OAuthProvider,
        message: &str,
    ) -> bool {
        if !looks_like_invalid_token(message) {
            return false;
        }
        self.ensure_valid(
            provider_type,
            token_file,
            provider,
            EnsureValidOptions {
                force_reauth: false,
                force_reacquire_if_refresh_fails: true,
            },
        )
        .await
        .is_ok()
    }
}

fn looks_like_invalid_token(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("401")
        || lower.contains("403")
        || lower.contains("invalid_token")
        || lower.contains("invalid-token")
        || lower.contains("expired")
        || lower.contains("40308")
}

fn is_fresh(record: &CredentialRecord, provider_family: &str) -> bool {
    let now_ms = now_epoch_ms();
    record.is_fresh(now_ms, FRESHNESS_SKEW_MS) && record.has_required_field(provider_family)
}

fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

async fn read_record(token_file: &str) -> Result<CredentialRecord, OAuthError> {
    let bytes = tokio::fs::read(token_file)
        .await
        .map_err(|err| OAuthError::Io(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|_| OAuthError::NoToken)
}

async fn write_record(token_file: &str, record: &CredentialRecord) -> Result<(), OAuthError> {
    if let Some(parent) = std::path::Path::new(token_file).parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| OAuthError::Io(err.to_string()))?;
    }
    let body = serde_json::to_vec_pretty(record).map_err(|err| OAuthError::Io(err.to_string()))?;
    tokio::fs::write(token_file, body)
        .await
        .map_err(|err| OAuthError::Io(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyProvider {
        family: &'static str,
    }

    #[async_trait]
    impl OAuthProvider for FlakyProvider {
        fn provider_family(&self) -> &str {
            self.family
        }

        async fn refresh(&self, _record: &CredentialRecord) -> Result<CredentialRecord, OAuthError> {
            Err(OAuthError::RefreshFailed("boom".to_string()))
        }

        async fn interactive(&self) -> Result<CredentialRecord, OAuthError> {
            Ok(CredentialRecord {
                access_token: "fresh".to_string(),
                refresh_token: Some("r".to_string()),
                expires_at: now_epoch_ms() + 3_600_000,
                api_key: None,
                created_at: now_epoch_ms(),
            })
        }
    }

    #[test]
    fn invalid_token_detection_is_case_insensitive() {
        assert!(looks_like_invalid_token("Invalid_Token received"));
        assert!(looks_like_invalid_token("HTTP 401 Unauthorized"));
        assert!(!looks_like_invalid_token("rate limited"));
    }

    #[tokio::test]
    async fn missing_token_falls_back_to_interactive() {
        let manager = OAuthLifecycleManager::new();
        let dir = std::env::temp_dir().join(format!(
            "routecodex-oauth-test-{}",
            now_epoch_ms()
        ));
        let token_file = dir.join("token.json");
        let provider = FlakyProvider { family: "qwen" };
        let result = manager
            .ensure_valid(
                "qwen",
                token_file.to_str().unwrap(),
                &provider,
                EnsureValidOptions::default(),
            )
            .await;
        assert!(result.is_ok());
        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
