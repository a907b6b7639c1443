//! The conversion codec facade (spec component C1): converts payloads
//! between the three supported wire protocols, keyed by
//! `(client_protocol, target_protocol)`. Holds no per-request state; all
//! state needed for streaming lives in [`stream::StreamBridgeState`], owned
//! by the caller.

pub mod anthropic_openai;
pub mod context;
pub mod error;
pub mod facade;
pub mod passthrough;
pub mod responses_openai;
pub mod stream;
mod trait_def;

pub use anthropic_openai::AnthropicOpenAiCodec;
pub use context::CodecContext;
pub use error::CodecError;
pub use facade::CodecFacade;
pub use passthrough::PassthroughCodec;
pub use responses_openai::ResponsesOpenAiCodec;
pub use trait_def::ConversionCodec;
