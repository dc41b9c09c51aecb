//! Client for the outbound bridge, used by agent-side code and `clawbridge push`.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::SEND_PATH;
use crate::access::qualify_user_id;
use crate::bus::OutboundPushRequest;
use crate::errors::BridgeError;
use crate::utils::http::{ERROR_BODY_BYTES, default_http_client, limited_text};

#[derive(Debug, Deserialize)]
struct PushResponse {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

pub struct BridgeClient {
    base_url: String,
    client: reqwest::Client,
}

/// Resolve a media path for the bridge: absolute, and only when it exists.
pub fn resolve_media(media: &Path) -> Option<String> {
    let absolute = std::path::absolute(media).ok()?;
    if absolute.is_file() {
        Some(absolute.to_string_lossy().into_owned())
    } else {
        warn!("media file {} not found, sending without it", media.display());
        None
    }
}

impl BridgeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: default_http_client(),
        }
    }

    /// Build the push request without sending it.
    ///
    /// The destination is qualified (`+55 (11) 9999-0000` becomes
    /// `551199990000@c.us`) and media is only attached when the file exists.
    pub fn request(to: &str, message: Option<&str>, media: Option<&Path>) -> OutboundPushRequest {
        OutboundPushRequest {
            to: qualify_user_id(to),
            message: message
                .filter(|m| !m.trim().is_empty())
                .map(str::to_string),
            media_path: media.and_then(resolve_media),
        }
    }

    /// Push a message or media item through the bridge.
    pub async fn push(
        &self,
        to: &str,
        message: Option<&str>,
        media: Option<&Path>,
    ) -> Result<(), BridgeError> {
        let request = Self::request(to, message, media);
        let url = format!("{}{}", self.base_url, SEND_PATH);
        debug!("pushing to {} via {}", request.to, url);

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BridgeError::TransportSend(format!("bridge unreachable: {}", e)))?;

        let status = resp.status();
        let body = limited_text(resp, ERROR_BODY_BYTES).await?;
        let parsed: Option<PushResponse> = serde_json::from_str(&body).ok();
        match parsed {
            Some(r) if status.is_success() && r.status == "success" => Ok(()),
            Some(r) => Err(BridgeError::Rejected {
                status: status.as_u16(),
                message: r.reason.unwrap_or(r.status),
            }),
            None => Err(BridgeError::Rejected {
                status: status.as_u16(),
                message: body,
            }),
        }
    }
}
