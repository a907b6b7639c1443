//! TOML config file shape and loader. Deliberately thin: parses into the
//! same structs `routecodex-core`/`routecodex-provider-core` already
//! expose, then hands the result straight to `GatewayConfig` — this binary
//! owns file/env resolution, not schema definitions.

use std::collections::HashMap;

use anyhow::{Context, Result};
use routecodex_core::{GatewayConfig, ShapeFilterBundle};
use routecodex_provider_core::{ProviderProfile, RouteMetadata};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub routes: RouteMetadata,
    #[serde(default)]
    pub providers: HashMap<String, ProviderProfile>,
    #[serde(default)]
    pub shapers: HashMap<String, ShapeFilterBundle>,
}

pub async fn load(path: &str) -> Result<FileConfig> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read config file {path}"))?;
    toml::from_str(&raw).with_context(|| format!("parse config file {path}"))
}

pub fn into_gateway_config(file: &FileConfig, limits_env_prefix: &str) -> GatewayConfig {
    GatewayConfig {
        routes: file.routes.clone(),
        providers: file.providers.clone(),
        limits: routecodex_common::LimitsConfig::from_env(limits_env_prefix),
    }
}
