use serde::{Deserialize, Serialize};

/// On-disk OAuth/API-key token — one file per provider alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute epoch milliseconds.
    #[serde(default)]
    pub expires_at: i64,
    /// Some providers exchange the OAuth token for a long-lived API key;
    /// when present it is preferred over `access_token` for outbound auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

impl CredentialRecord {
    /// Fresh iff `expires_at - now > skew`. A token whose `expires_at`
    /// equals `now` is treated as expired, not fresh.
    pub fn is_fresh(&self, now_ms: i64, skew_ms: i64) -> bool {
        self.expires_at - now_ms > skew_ms
    }

    /// Provider-family-specific field requirement: `iflow` needs an
    /// exchanged `api_key`, `qwen` accepts a bare `access_token`, others
    /// accept either.
    pub fn has_required_field(&self, provider_family: &str) -> bool {
        match provider_family {
            "iflow" => self.api_key.is_some(),
            "qwen" => !self.access_token.is_empty(),
            _ => !self.access_token.is_empty() || self.api_key.is_some(),
        }
    }

    /// The bearer value to send upstream: the exchanged API key when
    /// present, else the raw access token.
    pub fn bearer_value(&self) -> &str {
        self.api_key.as_deref().unwrap_or(&self.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_equal_to_now_is_expired() {
        let record = CredentialRecord {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: 1_000,
            api_key: None,
            created_at: 0,
        };
        assert!(!record.is_fresh(1_000, 0));
        assert!(record.is_fresh(900, 0));
    }

    #[test]
    fn iflow_requires_exchanged_api_key() {
        let record = CredentialRecord {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: 0,
            api_key: None,
            created_at: 0,
        };
        assert!(!record.has_required_field("iflow"));
        assert!(record.has_required_field("qwen"));
    }
}
