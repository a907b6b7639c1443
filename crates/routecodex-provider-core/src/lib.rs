//! Core provider abstractions for routecodex.
//!
//! This crate does not depend on axum. Provider implementations construct
//! `UpstreamHttpRequest`s while `routecodex-core`'s transport performs the
//! outbound attempt; the one exception is OAuth2 refresh, which this crate
//! performs directly against `token_url` since it is not part of the
//! per-attempt send path the router retries.

pub mod config;
pub mod credential;
pub mod errors;
pub mod events;
pub mod headers;
pub mod oauth;
pub mod provider;
pub mod registry;

pub use config::{
    AuthConfig, PipelineId, PoolName, ProcessMode, ProviderKey, ProviderMetadata, ProviderProfile,
    RouteEntry, RouteMetadata, StreamingPolicy, TransportConfig,
};
pub use credential::{AcquireError, CredentialId, CredentialPool, CredentialRecord, CredentialState, UnavailableReason};
pub use errors::{OAuthError, ProviderError, ProviderResult};
pub use events::{
    DownstreamEvent, Event, EventHub, EventSink, OperationalEvent, SeriesCooldownEndEvent,
    SeriesCooldownStartEvent, TerminalEventSink, UnavailableEndEvent, UnavailableStartEvent,
    UpstreamEvent,
};
pub use headers::Headers;
pub use oauth::OAuthLifecycleManager;
pub use provider::{
    AuthRetryAction, GenericHttpProvider, HttpMethod, OAuthCallbackRequest, OAuthCallbackResult,
    OAuthCredential, OAuthStartRequest, UpstreamBody, UpstreamCtx, UpstreamHttpRequest,
    UpstreamHttpResponse, UpstreamProvider,
};
pub use registry::ProviderRegistry;
