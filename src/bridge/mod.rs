use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::gateway::HostPort;

#[derive(Clone)]
struct BridgeState {
    port: HostPort,
}

#[derive(Debug, Serialize)]
struct AcceptedBody {
    accepted: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

pub fn bridge_router(port: HostPort) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/message", post(handle_message))
        .with_state(BridgeState { port })
}

pub async fn run_bridge(port: HostPort, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind host bridge to `{bind}`"))?;
    serve_bridge(listener, port).await
}

pub async fn serve_bridge(listener: TcpListener, port: HostPort) -> Result<()> {
    let local_addr = listener.local_addr().ok();
    info!(
        bound_addr = local_addr.map(|addr| addr.to_string()),
        "starting host bridge"
    );

    axum::serve(listener, bridge_router(port))
        .await
        .context("host bridge exited with an error")
}

async fn handle_health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn handle_message(State(state): State<BridgeState>, Json(message): Json<Value>) -> Response {
    let kind = message
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("<none>")
        .to_owned();

    if state.port.post(message) {
        debug!(message_type = %kind, "forwarded host message");
        (StatusCode::ACCEPTED, Json(AcceptedBody { accepted: true })).into_response()
    } else {
        warn!(message_type = %kind, "surface listener is gone; dropping host message");
        let body = ErrorBody {
            error: "surface is no longer listening".to_owned(),
        };
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}
