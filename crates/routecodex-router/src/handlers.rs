//! One axum handler per entry endpoint (spec.md §6), each decoding a
//! protocol-specific body into an [`InboundRequest`], running it through
//! [`pipeline::run`], and rendering either a plain JSON response or a
//! synthesized SSE stream. Grounded in `gproxy-core::handler::proxy_handler`'s
//! decode/dispatch/render shape.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json as AxumJson;
use futures_util::stream;
use routecodex_protocol::{InboundRequest, ProviderProtocol};

use crate::error::GatewayError;
use crate::pipeline::{self, PipelineOutcome};
use crate::state::RouterState;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub async fn chat_completions(State(state): State<RouterState>, AxumJson(body): AxumJson<routecodex_protocol::openai_chat::ChatCompletionRequest>) -> Response {
    dispatch(&state, "/v1/chat/completions", ProviderProtocol::OpenAiChat, InboundRequest::OpenAiChat(body)).await
}

pub async fn messages(State(state): State<RouterState>, AxumJson(body): AxumJson<routecodex_protocol::anthropic::MessagesRequest>) -> Response {
    dispatch(&state, "/v1/messages", ProviderProtocol::Anthropic, InboundRequest::Anthropic(body)).await
}

pub async fn responses(State(state): State<RouterState>, AxumJson(body): AxumJson<routecodex_protocol::openai_responses::ResponsesRequest>) -> Response {
    dispatch(&state, "/v1/responses", ProviderProtocol::OpenAiResponses, InboundRequest::OpenAiResponses(body)).await
}

pub async fn submit_tool_outputs(
    State(state): State<RouterState>,
    Path(response_id): Path<String>,
    AxumJson(body): AxumJson<routecodex_protocol::openai_responses::SubmitToolOutputsRequest>,
) -> Response {
    dispatch(
        &state,
        "/v1/responses/:id/submit_tool_outputs",
        ProviderProtocol::OpenAiResponses,
        InboundRequest::SubmitToolOutputs { response_id, body },
    )
    .await
}

async fn dispatch(
    state: &RouterState,
    entry_endpoint: &str,
    client_protocol: ProviderProtocol,
    inbound: InboundRequest,
) -> Response {
    let request_id = routecodex_core::new_request_id();
    let outcome = pipeline::run(state, entry_endpoint, client_protocol, inbound, request_id.clone(), None).await;
    render(request_id, outcome)
}

fn render(request_id: String, outcome: Result<PipelineOutcome, GatewayError>) -> Response {
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            let mut response = err.into_response();
            set_request_id(&mut response, &request_id);
            return response;
        }
    };

    let mut response = if outcome.wants_stream {
        let frames = routecodex_core::streaming::synthesize_frames(&outcome.body, outcome.client_protocol, &request_id);
        let headers = routecodex_core::streaming::sse_headers(&request_id);
        let body = Body::from_stream(stream::iter(frames.into_iter().map(|frame| Ok::<_, std::convert::Infallible>(frame))));
        let mut response = Response::builder().status(StatusCode::OK).body(body).expect("static sse response is well-formed");
        for (name, value) in headers {
            if name == REQUEST_ID_HEADER {
                continue;
            }
            if let Ok(value) = HeaderValue::from_str(&value) {
                response.headers_mut().insert(name, value);
            }
        }
        response
    } else {
        let status = StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::OK);
        (status, AxumJson(outcome.body)).into_response()
    };

    set_request_id(&mut response, &request_id);
    response
}

fn set_request_id(response: &mut Response, request_id: &str) {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}

pub async fn health() -> impl IntoResponse {
    AxumJson(serde_json::json!({"status": "ok"}))
}

pub async fn config(State(state): State<RouterState>) -> impl IntoResponse {
    let config = state.config.load();
    AxumJson(serde_json::json!({
        "pools": config.routes.pools.keys().collect::<Vec<_>>(),
        "providers": config.providers.keys().collect::<Vec<_>>(),
    }))
}

pub async fn shutdown(State(_state): State<RouterState>) -> impl IntoResponse {
    tracing::warn!("shutdown requested via admin endpoint");
    tokio::spawn(async {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        std::process::exit(0);
    });
    AxumJson(serde_json::json!({"status": "shutting_down"}))
}
