mod provider_profile;
mod route_metadata;

pub use provider_profile::{AuthConfig, ProviderMetadata, ProviderProfile, TransportConfig};
pub use route_metadata::{
    PipelineId, PoolName, ProcessMode, ProviderKey, RouteEntry, RouteMetadata, StreamingPolicy,
};
