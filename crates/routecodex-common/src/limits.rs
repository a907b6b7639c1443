use std::time::Duration;

use crate::duration::parse_duration_hint;

/// Numeric knobs resolved once at bootstrap from environment overrides.
///
/// The running core never re-reads environment variables mid-request; a
/// frozen `LimitsConfig` is handed in at construction time alongside the
/// rest of `GatewayConfig`.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub request_timeout: Duration,
    pub pipeline_max_wait: Duration,
    pub max_provider_attempts: u32,
    pub antigravity_max_provider_attempts: u32,
    pub capacity_cooldown: Duration,
    pub default_quota_cooldown: Duration,
    pub oauth_auto_open: bool,
    pub oauth_force_reauth: bool,
    pub tool_safe_mode: bool,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(300_000),
            pipeline_max_wait: Duration::from_millis(300_000),
            max_provider_attempts: 6,
            antigravity_max_provider_attempts: 20,
            capacity_cooldown: Duration::from_secs(30),
            default_quota_cooldown: Duration::from_secs(300),
            oauth_auto_open: false,
            oauth_force_reauth: false,
            tool_safe_mode: false,
        }
    }
}

impl LimitsConfig {
    /// Reads `{prefix}_*` overrides, clamping attempt caps into sane ranges.
    pub fn from_env(prefix: &str) -> Self {
        let mut limits = Self::default();
        if let Some(v) = env_u64(prefix, "TIMEOUT_MS") {
            limits.request_timeout = Duration::from_millis(v);
        }
        if let Some(v) = env_u64(prefix, "PIPELINE_MAX_WAIT_MS") {
            limits.pipeline_max_wait = Duration::from_millis(v);
        }
        if let Some(v) = env_u64(prefix, "MAX_PROVIDER_ATTEMPTS") {
            limits.max_provider_attempts = v.clamp(1, 20) as u32;
        }
        if let Some(v) = env_u64(prefix, "ANTIGRAVITY_MAX_PROVIDER_ATTEMPTS") {
            limits.antigravity_max_provider_attempts = v.clamp(1, 60) as u32;
        }
        if let Some(v) = env_duration(prefix, "RL_CAPACITY_COOLDOWN") {
            limits.capacity_cooldown = v;
        }
        if let Some(v) = env_duration(prefix, "RL_DEFAULT_QUOTA_COOLDOWN") {
            limits.default_quota_cooldown = v;
        }
        limits.oauth_auto_open = env_flag(prefix, "OAUTH_AUTO_OPEN");
        limits.oauth_force_reauth = env_flag(prefix, "OAUTH_FORCE_REAUTH");
        limits.tool_safe_mode = env_flag(prefix, "TOOL_SAFE_MODE");
        limits
    }

    /// The attempt ceiling for a given provider key, routing `antigravity.*`
    /// keys to their own (higher) ceiling.
    pub fn attempt_cap_for(&self, provider_key: &str) -> u32 {
        if provider_key.starts_with("antigravity.") {
            self.antigravity_max_provider_attempts
        } else {
            self.max_provider_attempts
        }
    }
}

fn env_u64(prefix: &str, suffix: &str) -> Option<u64> {
    std::env::var(format!("{prefix}_{suffix}")).ok()?.parse().ok()
}

fn env_duration(prefix: &str, suffix: &str) -> Option<Duration> {
    let raw = std::env::var(format!("{prefix}_{suffix}")).ok()?;
    parse_duration_hint(&raw)
}

fn env_flag(prefix: &str, suffix: &str) -> bool {
    std::env::var(format!("{prefix}_{suffix}")).ok().as_deref() == Some("1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_cap_routes_antigravity_to_its_own_ceiling() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.attempt_cap_for("antigravity.g-pro.k1"), 20);
        assert_eq!(limits.attempt_cap_for("iflow.a"), 6);
    }
}
