//! Front-door Adapter shared state (component C11), wired from
//! `apps/routecodexd`'s bootstrap. Grounded in `gproxy-router::proxy`'s
//! `ProxyState { engine: Arc<ProxyEngine> }`, exploded into the concrete
//! pieces this workspace keeps as separate crates/components instead of
//! one monolithic engine struct.

use std::collections::HashMap;
use std::sync::Arc;

use routecodex_codec::CodecFacade;
use routecodex_core::{ConfigState, Invoker, SeriesCooldownRegistry, ShapeFilterBundle};
use routecodex_provider_core::{CredentialPool, EventHub, ProviderRegistry};

#[derive(Clone)]
pub struct RouterState {
    pub config: Arc<ConfigState>,
    pub providers: Arc<ProviderRegistry>,
    /// One credential pool per provider id.
    pub credentials: Arc<HashMap<String, CredentialPool>>,
    pub cooldowns: Arc<SeriesCooldownRegistry>,
    pub codec: Arc<CodecFacade>,
    /// One shape filter bundle per provider id; providers without a bundle
    /// skip compatibility shaping entirely.
    pub shapers: Arc<HashMap<String, ShapeFilterBundle>>,
    pub invoker: Arc<Invoker>,
    pub events: EventHub,
}
