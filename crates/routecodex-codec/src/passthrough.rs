use routecodex_protocol::Json;

use crate::{CodecContext, CodecError, ConversionCodec};

/// No-op codec used whenever `client_protocol == target_protocol`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCodec;

impl ConversionCodec for PassthroughCodec {
    fn convert_request(&self, payload: Json, _ctx: &CodecContext) -> Result<Json, CodecError> {
        Ok(payload)
    }

    fn convert_response(&self, payload: Json, _ctx: &CodecContext) -> Result<Json, CodecError> {
        Ok(payload)
    }
}
