//! The materialized config object the core receives at construction and on
//! reload: routes, provider profiles, pools, and environment-resolved
//! limits, frozen into an `ArcSwap` the way `gproxy-core::state::AppState`
//! freezes `GlobalConfig`.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use routecodex_common::LimitsConfig;
use routecodex_provider_core::{ProviderProfile, RouteMetadata};

/// One fully materialized config snapshot. Built once by the CLI/bootstrap
/// layer from validated TOML/JSON, never mutated in place.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub routes: RouteMetadata,
    pub providers: HashMap<String, ProviderProfile>,
    pub limits: LimitsConfig,
}

impl GatewayConfig {
    pub fn provider(&self, provider_id: &str) -> Option<&ProviderProfile> {
        self.providers.get(provider_id)
    }
}

/// Hot-swappable holder: readers take a cheap `Arc` snapshot, writers
/// install a new one atomically. No lock is ever held across an await.
pub struct ConfigState {
    current: ArcSwap<GatewayConfig>,
}

impl ConfigState {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    pub fn load(&self) -> Arc<GatewayConfig> {
        self.current.load_full()
    }

    pub fn reload(&self, config: GatewayConfig) {
        self.current.store(Arc::new(config));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_config() -> GatewayConfig {
        GatewayConfig {
            routes: RouteMetadata::default(),
            providers: HashMap::new(),
            limits: LimitsConfig::default(),
        }
    }

    #[test]
    fn reload_replaces_the_snapshot_atomically() {
        let state = ConfigState::new(empty_config());
        let before = state.load();
        assert!(before.providers.is_empty());

        let mut after = empty_config();
        after
            .providers
            .insert("glm".to_string(), provider_stub("glm"));
        state.reload(after);

        let loaded = state.load();
        assert!(loaded.provider("glm").is_some());
    }

    fn provider_stub(id: &str) -> ProviderProfile {
        use routecodex_protocol::ProviderProtocol;
        use routecodex_provider_core::{AuthConfig, ProviderMetadata, TransportConfig};
        ProviderProfile {
            provider_id: id.to_string(),
            protocol: ProviderProtocol::OpenAiChat,
            transport: TransportConfig {
                base_url: "https://example.invalid".to_string(),
                endpoint: None,
                timeout_ms: 1000,
                max_retries: 0,
                headers: None,
            },
            auth: AuthConfig::None,
            compatibility_profile: None,
            metadata: ProviderMetadata::default(),
        }
    }
}
