//! Client side of the agent service: the backend that turns a chat message
//! into a structured reply.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::bus::{AgentReply, AgentRequest};
use crate::errors::BridgeError;
use crate::utils::http::{ERROR_BODY_BYTES, http_client, limited_text};

#[async_trait]
pub trait AgentService: Send + Sync {
    /// One synchronous request/response exchange.
    ///
    /// Every failure (transport error, timeout, non-2xx, unreadable body)
    /// is reported as [`BridgeError::AgentUnreachable`].
    async fn ask(&self, request: &AgentRequest) -> Result<AgentReply, BridgeError>;
}

/// Agent reached over HTTP: `POST {url}` with `{sender, message}`.
pub struct HttpAgentClient {
    url: String,
    client: reqwest::Client,
}

impl HttpAgentClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl AgentService for HttpAgentClient {
    async fn ask(&self, request: &AgentRequest) -> Result<AgentReply, BridgeError> {
        let resp = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!("agent request to {} failed: {}", self.url, e);
                BridgeError::AgentUnreachable(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = limited_text(resp, ERROR_BODY_BYTES)
                .await
                .unwrap_or_default();
            warn!("agent returned {}: {}", status, body);
            return Err(BridgeError::AgentUnreachable(format!(
                "agent returned {}",
                status
            )));
        }

        let reply: AgentReply = resp
            .json()
            .await
            .map_err(|e| BridgeError::AgentUnreachable(format!("unreadable agent reply: {}", e)))?;
        debug!(
            "agent reply: text={}, media={}, audio={}",
            reply.body().is_some(),
            reply.media().is_some(),
            reply.audio().is_some()
        );
        Ok(reply.lift_sentinels())
    }
}

/// Replies with the message it was given. Used by `serve --echo` to test
/// the transport wiring without an agent.
pub struct EchoAgent;

#[async_trait]
impl AgentService for EchoAgent {
    async fn ask(&self, request: &AgentRequest) -> Result<AgentReply, BridgeError> {
        Ok(AgentReply::from_text(format!("echo: {}", request.message)))
    }
}
