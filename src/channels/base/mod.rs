use crate::bus::OutboundSend;
use async_trait::async_trait;

/// A chat transport with an explicit lifecycle.
///
/// Inbound events are pushed into the `mpsc` sender the transport was built
/// with; outbound calls go through [`crate::channels::Outbox`], which never
/// issues two calls at once.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn start(&self) -> anyhow::Result<()>;
    async fn stop(&self) -> anyhow::Result<()>;

    /// Whether the transport is started and able to send.
    fn is_ready(&self) -> bool;

    async fn send(&self, send: &OutboundSend) -> anyhow::Result<()>;

    /// Show a "composing" indicator in a conversation.
    /// Default is a no-op for transports without typing indicators.
    async fn send_composing(
        &self,
        _conversation_id: &str,
        _message_id: Option<&str>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Clear the "composing" indicator.
    /// Default is a no-op for transports whose indicator expires on its own.
    async fn clear_composing(&self, _conversation_id: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Split a message into chunks respecting UTF-8 character boundaries.
///
/// Prefers paragraph breaks, then line breaks, then a hard cut.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > limit {
        let mut split_at = limit;
        while split_at > 0 && !remaining.is_char_boundary(split_at) {
            split_at -= 1;
        }
        if split_at == 0 {
            // single character wider than limit
            split_at = remaining
                .char_indices()
                .nth(1)
                .map_or(remaining.len(), |(i, _)| i);
        }

        let head = &remaining[..split_at];
        let (chunk, rest) = if let Some(idx) = head.rfind("\n\n") {
            (&remaining[..idx], &remaining[idx + 2..])
        } else if let Some(idx) = head.rfind('\n') {
            (&remaining[..idx], &remaining[idx + 1..])
        } else {
            (head, &remaining[split_at..])
        };
        chunks.push(chunk.trim().to_string());
        remaining = rest;
    }

    if !remaining.is_empty() {
        chunks.push(remaining.trim().to_string());
    }

    chunks.into_iter().filter(|c| !c.is_empty()).collect()
}
