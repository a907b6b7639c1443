//! Front-door error taxonomy: everything a handler can fail with before a
//! request has been handed off to the pipeline, or after every candidate in
//! a pool has been exhausted. Grounded in `gproxy-core::error::ProxyError`'s
//! status/body pairing.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unknown entry endpoint: {0}")]
    UnknownEndpoint(String),
    #[error("malformed request body: {0}")]
    BadRequest(String),
    #[error("no route pool configured for this model")]
    NoPool,
    #[error("every candidate in the pool is unavailable or exhausted")]
    PoolExhausted,
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("no codec registered for this protocol pair: {0}")]
    Conversion(String),
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::UnknownEndpoint(_) => StatusCode::NOT_FOUND,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NoPool | GatewayError::PoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Conversion(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({"error": {"message": self.to_string(), "type": "gateway_error"}});
        (status, axum::Json(body)).into_response()
    }
}
