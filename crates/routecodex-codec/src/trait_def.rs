use routecodex_protocol::Json;

use crate::{CodecContext, CodecError};

/// A single (incoming protocol, outgoing protocol) conversion pair.
///
/// The facade holds no state of its own; it is a thin dispatcher onto
/// concrete implementations of this trait.
pub trait ConversionCodec: Send + Sync {
    /// Converts a request payload shaped like `ctx.client_protocol` into one
    /// shaped like `ctx.target_protocol`.
    fn convert_request(&self, payload: Json, ctx: &CodecContext) -> Result<Json, CodecError>;

    /// Converts a response payload shaped like `ctx.target_protocol` (the
    /// provider's wire shape) back into one shaped like `ctx.client_protocol`.
    fn convert_response(&self, payload: Json, ctx: &CodecContext) -> Result<Json, CodecError>;
}
