//! WhatsApp Cloud API transport.
//!
//! Inbound: a webhook server (verification handshake on `GET`, signed event
//! delivery on `POST`) that pushes every user message into the inbound
//! channel. Outbound: Graph API calls for text, media and typing indicators.

use crate::access::{GROUP_SUFFIX, qualify_user_id};
use crate::bus::{InboundMessage, MediaOptions, OutboundSend, SendContent};
use crate::channels::base::{ChatTransport, split_message};
use crate::config::WhatsAppConfig;
use crate::utils::http::{ERROR_BODY_BYTES, default_http_client, limited_text};
use crate::utils::media::{MediaKind, media_kind, mime_from_extension};
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::Sha256;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use subtle::ConstantTimeEq;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Graph API text body limit.
const TEXT_LIMIT: usize = 4096;

const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

struct Server {
    handle: JoinHandle<()>,
    shutdown: CancellationToken,
    addr: SocketAddr,
}

pub struct WhatsAppTransport {
    config: WhatsAppConfig,
    inbound_tx: mpsc::Sender<InboundMessage>,
    client: reqwest::Client,
    ready: AtomicBool,
    server: tokio::sync::Mutex<Option<Server>>,
}

impl WhatsAppTransport {
    pub fn new(config: WhatsAppConfig, inbound_tx: mpsc::Sender<InboundMessage>) -> Self {
        Self {
            config,
            inbound_tx,
            client: default_http_client(),
            ready: AtomicBool::new(false),
            server: tokio::sync::Mutex::new(None),
        }
    }

    /// Address the webhook server is bound to, once started.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().await.as_ref().map(|s| s.addr)
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.phone_number_id,
            resource
        )
    }

    async fn post_message(&self, payload: &Value) -> Result<Value> {
        let response = self
            .client
            .post(self.endpoint("messages"))
            .bearer_auth(&self.config.access_token)
            .json(payload)
            .send()
            .await
            .context("whatsapp API request failed")?;
        check_response(response).await
    }

    /// Upload a local file and return its media id.
    async fn upload_media(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read media file {}", path.display()))?;
        let mime = mime_from_extension(path);
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new()
            .text("messaging_product", "whatsapp")
            .text("type", mime)
            .part("file", part);

        let response = self
            .client
            .post(self.endpoint("media"))
            .bearer_auth(&self.config.access_token)
            .multipart(form)
            .send()
            .await
            .context("whatsapp media upload failed")?;
        let body = check_response(response).await?;
        body.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("whatsapp media upload returned no id"))
    }

    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        for chunk in split_message(text, TEXT_LIMIT) {
            if chunk.is_empty() {
                continue;
            }
            self.post_message(&text_payload(to, &chunk)).await?;
        }
        Ok(())
    }

    async fn send_media(&self, to: &str, path: &Path, options: &MediaOptions) -> Result<()> {
        let media_id = self.upload_media(path).await?;
        let kind = media_kind(path);
        let payload = media_payload(to, &media_id, kind, path, options);
        self.post_message(&payload).await?;

        // audio messages carry no caption; deliver it as a follow-up text
        if kind == MediaKind::Audio
            && let Some(caption) = options.caption.as_deref().filter(|c| !c.trim().is_empty())
        {
            self.send_text(to, caption).await?;
        }
        Ok(())
    }
}

async fn check_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = limited_text(response, ERROR_BODY_BYTES).await?;
    if !status.is_success() {
        anyhow::bail!("whatsapp API error ({}): {}", status, body);
    }
    Ok(serde_json::from_str(&body).unwrap_or(Value::Null))
}

/// Recipient fields for a qualified or bare destination.
///
/// Users are addressed by bare digits (any `@domain` or `:device` suffix is
/// dropped); group ids are passed through with the group recipient type.
fn recipient(to: &str) -> (&'static str, String) {
    let to = to.trim();
    if let Some(group) = to.strip_suffix(GROUP_SUFFIX) {
        return ("group", group.to_string());
    }
    let user = to.split('@').next().unwrap_or(to);
    let user = user.split(':').next().unwrap_or(user);
    let digits: String = user.chars().filter(char::is_ascii_digit).collect();
    ("individual", digits)
}

fn text_payload(to: &str, body: &str) -> Value {
    let (recipient_type, to) = recipient(to);
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": recipient_type,
        "to": to,
        "type": "text",
        "text": { "body": body },
    })
}

fn media_payload(
    to: &str,
    media_id: &str,
    kind: MediaKind,
    path: &Path,
    options: &MediaOptions,
) -> Value {
    let (recipient_type, to) = recipient(to);
    let caption = options
        .caption
        .as_deref()
        .filter(|c| !c.trim().is_empty());

    let mut object = json!({ "id": media_id });
    match kind {
        MediaKind::Audio => {
            if options.send_audio_as_voice {
                object["voice"] = Value::Bool(true);
            }
        }
        MediaKind::Document => {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                object["filename"] = Value::String(name.to_string());
            }
            if let Some(caption) = caption {
                object["caption"] = Value::String(caption.to_string());
            }
        }
        MediaKind::Image | MediaKind::Video => {
            if let Some(caption) = caption {
                object["caption"] = Value::String(caption.to_string());
            }
        }
    }

    let mut payload = json!({
        "messaging_product": "whatsapp",
        "recipient_type": recipient_type,
        "to": to,
        "type": kind.as_str(),
    });
    payload[kind.as_str()] = object;
    payload
}

fn typing_payload(message_id: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "status": "read",
        "message_id": message_id,
        "typing_indicator": { "type": "text" },
    })
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct WebhookState {
    verify_token: String,
    app_secret: String,
    phone_number_id: String,
    inbound_tx: mpsc::Sender<InboundMessage>,
}

impl WebhookState {
    pub(crate) fn new(config: &WhatsAppConfig, inbound_tx: mpsc::Sender<InboundMessage>) -> Self {
        Self {
            verify_token: config.verify_token.clone(),
            app_secret: config.app_secret.clone(),
            phone_number_id: config.phone_number_id.clone(),
            inbound_tx,
        }
    }
}

pub(crate) fn webhook_router(path: &str, state: WebhookState) -> Router {
    Router::new()
        .route(path, get(verify_handler).post(event_handler))
        .with_state(state)
}

/// Check an `X-Hub-Signature-256` header (`sha256=<hex>`) against the body.
pub(crate) fn verify_signature(app_secret: &str, header: &str, body: &[u8]) -> bool {
    let Some(hex_sig) = header.trim().strip_prefix("sha256=") else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());
    expected
        .as_bytes()
        .ct_eq(hex_sig.to_ascii_lowercase().as_bytes())
        .into()
}

async fn verify_handler(
    State(state): State<WebhookState>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let mode = params.get("hub.mode").map_or("", String::as_str);
    let token = params.get("hub.verify_token").map_or("", String::as_str);
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();

    let token_ok: bool = !state.verify_token.is_empty()
        && state.verify_token.as_bytes().ct_eq(token.as_bytes()).into();
    if mode == "subscribe" && token_ok {
        info!("whatsapp webhook verified");
        (StatusCode::OK, challenge).into_response()
    } else {
        warn!("whatsapp webhook: verification rejected (mode={})", mode);
        StatusCode::FORBIDDEN.into_response()
    }
}

async fn event_handler(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> axum::response::Response {
    if !state.app_secret.is_empty() {
        let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
            warn!("whatsapp webhook: missing {} header", SIGNATURE_HEADER);
            return StatusCode::FORBIDDEN.into_response();
        };
        if !verify_signature(&state.app_secret, signature, &body) {
            warn!("whatsapp webhook: invalid signature");
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!("whatsapp webhook: unparseable payload: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    for message in parse_inbound(&payload, &state.phone_number_id) {
        debug!(
            "whatsapp webhook: message {} from {}",
            message.message_id.as_deref().unwrap_or("-"),
            message.sender_id
        );
        if let Err(e) = state.inbound_tx.send(message).await {
            error!("whatsapp webhook: inbound channel closed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    StatusCode::OK.into_response()
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WebhookPayload {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeValue {
    metadata: Option<Metadata>,
    #[serde(default)]
    contacts: Vec<Contact>,
    #[serde(default)]
    messages: Vec<WaMessage>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(default)]
    phone_number_id: String,
}

#[derive(Debug, Deserialize)]
struct Contact {
    #[serde(default)]
    wa_id: String,
    profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaMessage {
    from: String,
    #[serde(default)]
    id: String,
    timestamp: Option<String>,
    #[serde(default, rename = "type")]
    kind: String,
    text: Option<TextBody>,
    image: Option<CaptionedMedia>,
    video: Option<CaptionedMedia>,
    document: Option<CaptionedMedia>,
    button: Option<ButtonBody>,
    group_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextBody {
    body: String,
}

#[derive(Debug, Deserialize)]
struct CaptionedMedia {
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ButtonBody {
    text: String,
}

impl WaMessage {
    fn body(&self) -> Option<&str> {
        let body = match self.kind.as_str() {
            "text" => self.text.as_ref().map(|t| t.body.as_str()),
            "image" => self.image.as_ref().and_then(|m| m.caption.as_deref()),
            "video" => self.video.as_ref().and_then(|m| m.caption.as_deref()),
            "document" => self.document.as_ref().and_then(|m| m.caption.as_deref()),
            "button" => self.button.as_ref().map(|b| b.text.as_str()),
            _ => None,
        };
        body.filter(|b| !b.trim().is_empty())
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
            .as_deref()
            .and_then(|t| t.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now)
    }
}

/// Extract user messages addressed to `phone_number_id` from a webhook delivery.
///
/// Status updates and message types without a text body are skipped.
pub(crate) fn parse_inbound(payload: &WebhookPayload, phone_number_id: &str) -> Vec<InboundMessage> {
    let mut out = Vec::new();
    for change in payload.entry.iter().flat_map(|e| &e.changes) {
        let value = &change.value;
        if let Some(meta) = &value.metadata
            && !phone_number_id.is_empty()
            && !meta.phone_number_id.is_empty()
            && meta.phone_number_id != phone_number_id
        {
            debug!(
                "whatsapp webhook: ignoring delivery for number id {}",
                meta.phone_number_id
            );
            continue;
        }

        for msg in &value.messages {
            let Some(body) = msg.body() else {
                debug!("whatsapp webhook: skipping {} message {}", msg.kind, msg.id);
                continue;
            };
            let display_name = value
                .contacts
                .iter()
                .find(|c| c.wa_id == msg.from)
                .and_then(|c| c.profile.as_ref())
                .and_then(|p| p.name.clone());
            let sender_id = qualify_user_id(&msg.from);
            let (conversation_id, is_group) = match msg.group_id.as_deref() {
                Some(gid) if !gid.is_empty() => (format!("{}{}", gid, GROUP_SUFFIX), true),
                _ => (sender_id.clone(), false),
            };
            out.push(InboundMessage {
                sender_id,
                sender_display_name: display_name,
                body: body.to_string(),
                conversation_id,
                is_group,
                message_id: Some(msg.id.clone()).filter(|id| !id.is_empty()),
                timestamp: msg.timestamp(),
            });
        }
    }
    out
}

#[async_trait]
impl ChatTransport for WhatsAppTransport {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn start(&self) -> Result<()> {
        let mut server = self.server.lock().await;
        if server.is_some() {
            return Ok(());
        }

        if self.config.app_secret.is_empty() {
            warn!("whatsapp appSecret not set, webhook signatures are not checked");
        }

        let app = webhook_router(
            &self.config.webhook_path,
            WebhookState::new(&self.config, self.inbound_tx.clone()),
        );
        let bind = format!("{}:{}", self.config.webhook_host, self.config.webhook_port);
        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .with_context(|| format!("failed to bind whatsapp webhook on {}", bind))?;
        let addr = listener.local_addr()?;
        info!(
            "whatsapp webhook server listening on {}{}",
            addr, self.config.webhook_path
        );

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
            {
                error!("whatsapp webhook server error: {}", e);
            }
        });

        *server = Some(Server {
            handle,
            shutdown,
            addr,
        });
        self.ready.store(true, Ordering::SeqCst);
        info!("whatsapp transport started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.ready.store(false, Ordering::SeqCst);
        let Some(server) = self.server.lock().await.take() else {
            return Ok(());
        };
        server.shutdown.cancel();
        if let Err(e) = server.handle.await {
            warn!("whatsapp webhook task ended abnormally: {}", e);
        }
        info!("whatsapp transport stopped");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn send(&self, send: &OutboundSend) -> Result<()> {
        match &send.content {
            SendContent::Text(text) => self.send_text(&send.to, text).await,
            SendContent::Media { path, options } => {
                self.send_media(&send.to, path, options).await
            }
        }
    }

    async fn send_composing(&self, conversation_id: &str, message_id: Option<&str>) -> Result<()> {
        // The Cloud API ties typing indicators to the message being answered.
        let Some(message_id) = message_id else {
            debug!("whatsapp: no message id for {}, skipping typing indicator", conversation_id);
            return Ok(());
        };
        self.post_message(&typing_payload(message_id)).await?;
        Ok(())
    }
}
