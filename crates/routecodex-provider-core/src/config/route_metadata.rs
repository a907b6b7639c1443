use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use routecodex_protocol::ProviderProtocol;

pub type PipelineId = String;
pub type PoolName = String;
pub type ProviderKey = String;

/// Immutable per-reload snapshot of routing state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteMetadata {
    pub routes: HashMap<PipelineId, RouteEntry>,
    pub pools: HashMap<PoolName, Vec<ProviderKey>>,
}

impl RouteMetadata {
    pub fn entry(&self, pipeline_id: &str) -> Option<&RouteEntry> {
        self.routes.get(pipeline_id)
    }

    pub fn pool(&self, name: &str) -> Option<&[ProviderKey]> {
        self.pools.get(name).map(|v| v.as_slice())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEntry {
    pub provider_id: String,
    pub provider_key: ProviderKey,
    pub model_id: String,
    pub provider_protocol: ProviderProtocol,
    pub entry_endpoints: Vec<String>,
    pub process_mode: ProcessMode,
    pub streaming: StreamingPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessMode {
    Streaming,
    NonStreaming,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamingPolicy {
    Always,
    Never,
    /// Follow what the inbound request asked for.
    Auto,
}

impl StreamingPolicy {
    pub fn resolve(self, requested: bool) -> bool {
        match self {
            StreamingPolicy::Always => true,
            StreamingPolicy::Never => false,
            StreamingPolicy::Auto => requested,
        }
    }
}
