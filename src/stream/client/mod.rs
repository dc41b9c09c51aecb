use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::render::Renderer;
use super::session::{Busy, Failure, StreamOutcome, View, consume};
use crate::errors::BridgeError;
use crate::utils::http::{ERROR_BODY_BYTES, limited_text, streaming_http_client};
use crate::utils::media::mime_from_extension;

/// Poll interval while the agent reports not-ready.
const READY_POLL: Duration = Duration::from_secs(3);
/// Poll interval after a failed status request.
const ERROR_POLL: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Client for the agent's browser-facing chat surface.
pub struct WebChatClient {
    base_url: String,
    client: reqwest::Client,
    renderer: Renderer,
    ready_poll: Duration,
    error_poll: Duration,
}

impl WebChatClient {
    pub fn new(base_url: impl Into<String>, renderer: Renderer) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: streaming_http_client(),
            renderer,
            ready_poll: READY_POLL,
            error_poll: ERROR_POLL,
        }
    }

    #[must_use]
    pub fn with_poll_intervals(mut self, ready: Duration, error: Duration) -> Self {
        self.ready_poll = ready;
        self.error_poll = error;
        self
    }

    /// `GET /api/status`.
    pub async fn status(&self) -> Result<bool, BridgeError> {
        let url = format!("{}/api/status", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| BridgeError::AgentUnreachable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BridgeError::AgentUnreachable(format!(
                "status endpoint returned {}",
                resp.status()
            )));
        }
        let status: StatusResponse = resp
            .json()
            .await
            .map_err(|e| BridgeError::AgentUnreachable(e.to_string()))?;
        Ok(status.ready)
    }

    /// Poll `status` until the agent reports ready or `deadline` passes.
    pub async fn wait_until_ready(&self, deadline: Duration) -> Result<(), BridgeError> {
        let give_up = tokio::time::Instant::now() + deadline;
        loop {
            let pause = match self.status().await {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    debug!("agent not ready yet");
                    self.ready_poll
                }
                Err(e) => {
                    debug!("agent status check failed: {}", e);
                    self.error_poll
                }
            };
            if tokio::time::Instant::now() + pause > give_up {
                return Err(BridgeError::AgentUnreachable(format!(
                    "agent not ready after {}s",
                    deadline.as_secs()
                )));
            }
            tokio::time::sleep(pause).await;
        }
    }

    /// Send one message (and optional attachment) and stream the reply into `view`.
    ///
    /// The view is busy from the moment the request starts until this call
    /// returns, whatever the outcome.
    pub async fn chat<V: View + ?Sized>(
        &self,
        message: &str,
        attachment: Option<&Path>,
        view: &mut V,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, BridgeError> {
        if message.trim().is_empty() && attachment.is_none() {
            return Err(BridgeError::Rejected {
                status: 400,
                message: "message cannot be empty".into(),
            });
        }

        let mut view = Busy::new(view);

        let form = match build_form(message, attachment).await {
            Ok(form) => form,
            Err(e) => {
                view.show_failure(&Failure::from(&e));
                return Err(e);
            }
        };

        let url = format!("{}/api/chat", self.base_url);
        let resp = match self.client.post(&url).multipart(form).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("chat request failed: {}", e);
                let err = BridgeError::AgentUnreachable(e.to_string());
                view.show_failure(&Failure::from(&err));
                return Err(err);
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = limited_text(resp, ERROR_BODY_BYTES)
                .await
                .unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            view.show_failure(&Failure::Rejected(message.clone()));
            return Err(BridgeError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let outcome = consume(resp.bytes_stream(), &self.renderer, &mut *view, cancel).await;
        info!(
            "chat stream finished: state={:?}, chars={}",
            outcome.state,
            outcome.render.text.len()
        );
        Ok(outcome)
    }
}

async fn build_form(message: &str, attachment: Option<&Path>) -> Result<Form, BridgeError> {
    let mut form = Form::new().text("message", message.to_string());
    if let Some(path) = attachment {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            BridgeError::Internal(anyhow::anyhow!(
                "failed to read attachment {}: {}",
                path.display(),
                e
            ))
        })?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_from_extension(path))
            .map_err(|e| BridgeError::Internal(e.into()))?;
        form = form.part("file", part);
    }
    Ok(form)
}
