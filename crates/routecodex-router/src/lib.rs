//! Front-door Adapter (component C11): the single axum `Router` entry
//! endpoints bind to, plus the shared [`RouterState`] `apps/routecodexd`
//! constructs at bootstrap. Grounded in `gproxy-router::proxy::proxy_router`,
//! with the admin surface scoped down to health/config/shutdown per this
//! gateway's narrower operational footprint.

pub mod convert;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod state;

pub use error::GatewayError;
pub use pipeline::{run, PipelineOutcome};
pub use state::RouterState;

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;

pub fn build_router(state: RouterState) -> Router {
    let admin = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::config))
        .route("/shutdown", post(handlers::shutdown))
        .layer(middleware::from_fn(require_loopback));

    Router::new()
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/messages", post(handlers::messages))
        .route("/v1/responses", post(handlers::responses))
        .route("/v1/responses/{id}/submit_tool_outputs", post(handlers::submit_tool_outputs))
        .merge(admin)
        .with_state(state)
}

/// `/health`, `/config`, and `/shutdown` answer only when the peer connected
/// over loopback; every other caller gets 404 rather than a hint the route
/// exists.
async fn require_loopback(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if !addr.ip().is_loopback() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(next.run(req).await)
}
