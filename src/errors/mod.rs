use thiserror::Error;

/// Typed error hierarchy for clawbridge.
///
/// Use at module boundaries (agent calls, transport sends, stream reads, config validation).
/// Internal/leaf functions can continue using `anyhow::Result`; the `Internal` variant
/// allows seamless conversion via the `?` operator.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sender not allowed")]
    Unauthorized,

    #[error("Agent service unreachable: {0}")]
    AgentUnreachable(String),

    #[error("Malformed stream frame: {0}")]
    MalformedFrame(String),

    #[error("Transport send failed: {0}")]
    TransportSend(String),

    #[error("Stream read failed: {0}")]
    StreamRead(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BridgeError {
    /// Whether the failure came from the network rather than from a peer's answer.
    ///
    /// Nothing in the bridge retries automatically; callers use this to pick
    /// which failure indicator to surface.
    pub fn is_network(&self) -> bool {
        match self {
            Self::AgentUnreachable(_) | Self::StreamRead(_) | Self::TransportSend(_) => true,
            Self::Config(_)
            | Self::Unauthorized
            | Self::MalformedFrame(_)
            | Self::Rejected { .. }
            | Self::Internal(_) => false,
        }
    }
}
