//! Wires a loaded config into a running [`RouterState`]: provider registry,
//! credential pools, cooldown registry, transport, invoker. Grounded in
//! `gproxy-core::bootstrap::bootstrap`'s construction order, minus the
//! storage/DB tier this gateway doesn't have.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use routecodex_codec::CodecFacade;
use routecodex_core::{ConfigState, Invoker, SeriesCooldownRegistry, UpstreamClientConfig, WreqUpstreamClient};
use routecodex_provider_core::{
    AuthConfig, CredentialPool, CredentialRecord, EventHub, GenericHttpProvider, ProviderRegistry,
    TerminalEventSink,
};
use routecodex_router::RouterState;

use crate::config::{self, FileConfig};

pub async fn bootstrap(config_path: &str) -> Result<RouterState> {
    let file = config::load(config_path).await?;
    let gateway_config = config::into_gateway_config(&file, "ROUTECODEX");

    let events = EventHub::new(1024);
    events.add_sink(Arc::new(TerminalEventSink::new())).await;

    let mut registry = ProviderRegistry::new();
    let generic_provider: Arc<dyn routecodex_provider_core::UpstreamProvider> = Arc::new(GenericHttpProvider::new());
    for provider_id in file.providers.keys() {
        registry.register_as(provider_id.clone(), generic_provider.clone());
    }

    let mut credentials: HashMap<String, CredentialPool> = HashMap::new();
    for (provider_id, profile) in &file.providers {
        let pool = CredentialPool::new(events.clone());
        let record = seed_credential(profile);
        let provider_keys = alias_keys_for(&file.routes, provider_id);
        for key in provider_keys {
            pool.insert(provider_id.clone(), key, record.clone()).await;
        }
        credentials.insert(provider_id.clone(), pool);
    }

    let transport_config = UpstreamClientConfig::default();
    let transport: Arc<dyn routecodex_core::UpstreamClient> =
        Arc::new(WreqUpstreamClient::new(transport_config).context("build upstream transport")?);
    let invoker = Arc::new(Invoker::new(transport, events.clone()));

    Ok(RouterState {
        config: Arc::new(ConfigState::new(gateway_config)),
        providers: Arc::new(registry),
        credentials: Arc::new(credentials),
        cooldowns: SeriesCooldownRegistry::new(events.clone()),
        codec: Arc::new(CodecFacade::new()),
        shapers: Arc::new(file.shapers.clone()),
        invoker,
        events,
    })
}

/// Every `provider_key` alias this provider id appears under, across every
/// configured pool, so credential lookups by alias succeed regardless of
/// which pool a request resolves to.
fn alias_keys_for(routes: &routecodex_provider_core::RouteMetadata, provider_id: &str) -> Vec<String> {
    let mut keys: Vec<String> = routes
        .routes
        .values()
        .filter(|entry| entry.provider_id == provider_id)
        .map(|entry| entry.provider_key.clone())
        .collect();
    keys.sort();
    keys.dedup();
    if keys.is_empty() {
        keys.push(provider_id.to_string());
    }
    keys
}

/// One credential shared across every alias of a provider id; see
/// DESIGN.md for why per-alias credentials aren't modeled separately.
fn seed_credential(profile: &routecodex_provider_core::ProviderProfile) -> CredentialRecord {
    match &profile.auth {
        AuthConfig::None => CredentialRecord {
            access_token: String::new(),
            refresh_token: None,
            expires_at: i64::MAX,
            api_key: None,
            created_at: 0,
        },
        AuthConfig::ApiKey { value, env_ref, .. } => {
            let key = value
                .clone()
                .or_else(|| env_ref.as_deref().and_then(|name| std::env::var(name).ok()))
                .unwrap_or_default();
            CredentialRecord {
                access_token: String::new(),
                refresh_token: None,
                expires_at: i64::MAX,
                api_key: Some(key),
                created_at: 0,
            }
        }
        // Expired on purpose: the generic provider's `build_request` asks
        // the OAuth lifecycle manager for a fresh token before every call,
        // so an expired seed forces the first request to refresh from disk.
        AuthConfig::OAuth { .. } => CredentialRecord {
            access_token: String::new(),
            refresh_token: None,
            expires_at: 0,
            api_key: None,
            created_at: 0,
        },
    }
}
