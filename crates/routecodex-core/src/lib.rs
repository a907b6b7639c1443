//! The gateway core: config state, HTTP transport, the pipeline DTO, the
//! virtual router/retry engine, the compatibility shaper, the provider
//! invoker, and the SSE/streaming substrate. The attempt loop that actually
//! drives a request through these pieces in order lives in
//! `routecodex-router::pipeline::run`, not here — see that module's doc
//! comment and DESIGN.md for why. `apps/routecodexd` wires the whole thing
//! into a process.

pub mod config;
pub mod invoker;
pub mod pipeline;
pub mod router;
pub mod shaper;
pub mod sse;
pub mod streaming;
pub mod transport;

pub use config::{ConfigState, GatewayConfig};
pub use invoker::{Invoker, ProviderErrorCode};
pub use pipeline::{DebugOptions, DebugStages, PipelineData, PipelineDto, RouteBinding};
pub use router::{
    classify_failure, resolve_pool_name, select_next_candidate, ErrorClass, RetryEngine,
    RetryLedger, RetryOutcome, SeriesCooldownRegistry,
};
pub use shaper::{ShapeFilterBundle, ShapeOp};
pub use transport::{UpstreamClient, UpstreamClientConfig, WreqUpstreamClient};

/// A freshly generated, lowercase hex request id, used wherever the
/// orchestrator entrypoint isn't handed one by the caller (e.g. by
/// `routecodex-router` picking one up from an inbound header).
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique_and_hex() {
        let a = new_request_id();
        let b = new_request_id();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
