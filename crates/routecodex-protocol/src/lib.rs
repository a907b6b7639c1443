//! Wire-shape DTOs for the three supported inbound protocols, plus the
//! neutral [`json::Json`] tree the pipeline operates on internally.
//!
//! Nothing in this crate depends on an async runtime or HTTP client —
//! it is pure data modeling, imported by both the codec and the core.

pub mod anthropic;
pub mod inbound;
pub mod json;
pub mod openai_chat;
pub mod openai_responses;
pub mod protocol;

pub use inbound::InboundRequest;
pub use json::Json;
pub use protocol::ProviderProtocol;
