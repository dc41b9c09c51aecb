//! Outbound bridge server.
//!
//! Lets the agent push unsolicited messages through the chat transport:
//! `POST /send_whatsapp` with `{to, message?, mediaPath?}`. Requests are
//! parsed concurrently; every send goes through the shared [`Outbox`].

pub mod client;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::access::qualify_user_id;
use crate::bus::{MediaOptions, OutboundPushRequest, OutboundSend};
use crate::channels::Outbox;
use crate::utils::media::is_audio_path;

pub use client::BridgeClient;

/// Max request body: 1 MB.
const MAX_BODY: usize = 1_048_576;

pub const SEND_PATH: &str = "/send_whatsapp";

#[derive(Clone)]
struct BridgeState {
    outbox: Outbox,
}

/// Turn a push request into at most one send.
///
/// Media wins over text; audio files (by extension) go out as voice notes.
/// A request with neither is a no-op.
pub fn plan_push(req: &OutboundPushRequest) -> Option<OutboundSend> {
    let to = qualify_user_id(&req.to);
    let message = req
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string);

    if let Some(media) = req.media_path.as_deref().filter(|p| !p.trim().is_empty()) {
        let options = MediaOptions {
            caption: message,
            send_audio_as_voice: is_audio_path(media),
        };
        return Some(OutboundSend::media(to, media, options));
    }
    message.map(|m| OutboundSend::text(to, m))
}

fn success() -> axum::response::Response {
    (StatusCode::OK, Json(json!({"status": "success"}))).into_response()
}

fn failure(status: StatusCode, reason: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(json!({"status": "error", "reason": reason.into()})),
    )
        .into_response()
}

pub(crate) fn build_router(outbox: Outbox) -> Router {
    Router::new()
        .route(SEND_PATH, post(send_handler))
        .route("/api/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY))
        .with_state(BridgeState { outbox })
}

/// POST /send_whatsapp
async fn send_handler(
    State(state): State<BridgeState>,
    body: Result<Json<OutboundPushRequest>, JsonRejection>,
) -> axum::response::Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!("bridge: rejected push request: {}", rejection.body_text());
            return failure(rejection.status(), rejection.body_text());
        }
    };

    let Some(send) = plan_push(&req) else {
        debug!("bridge: push to {} had nothing to send", req.to);
        return success();
    };

    if req.to.trim().is_empty() {
        return failure(StatusCode::BAD_REQUEST, "missing destination");
    }

    let to = send.to.clone();
    match state.outbox.send(send).await {
        Ok(()) => {
            info!("bridge: pushed to {}", to);
            success()
        }
        Err(e) => {
            error!("bridge: push to {} failed: {}", to, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /api/health
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

/// Bind and serve the bridge until `shutdown` is cancelled.
pub async fn start(
    host: &str,
    port: u16,
    outbox: Outbox,
    shutdown: CancellationToken,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr)> {
    let app = build_router(outbox);
    let bind = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind bridge on {}", bind))?;
    let addr = listener.local_addr()?;
    info!("bridge listening on {}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
        {
            error!("bridge server error: {}", e);
        }
    });

    Ok((handle, addr))
}
