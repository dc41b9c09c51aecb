//! Inbound relay: one chat message in, zero or more chat sends out.
//!
//! Flow per message: access filter, composing indicator, one agent call,
//! reply mapping, clear composing. Nothing here propagates an error back to
//! the transport; failures end as a fixed apology line at most.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::access::{Whitelist, authorize};
use crate::agent::AgentService;
use crate::bus::{AgentReply, AgentRequest, InboundMessage, MediaOptions, OutboundSend};
use crate::channels::Outbox;
use crate::utils::preview;

/// Sent when the agent answered with neither text nor media.
pub const EMPTY_REPLY_FALLBACK: &str = "I had a problem processing that message...";

/// Sent when the agent could not be reached or a reply could not be delivered.
pub const APOLOGY: &str =
    "Sorry, the assistant is offline or hit a critical error. Make sure the agent service is running!";

/// Characters of an accepted message body shown in logs.
const LOG_PREVIEW_CHARS: usize = 50;

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Dropped by the access filter. Nothing was sent anywhere.
    Denied,
    /// The agent answered; these sends were delivered.
    Replied { sends: usize },
    /// The apology line was sent (agent unreachable or delivery failed).
    Fallback,
}

/// Map an agent reply to the sends that deliver it.
///
/// Media takes precedence over text: when both are present the text rides
/// along as the caption. With neither, the empty-reply line is sent. Audio
/// is independent and always becomes an extra voice-note send.
pub fn plan_reply_sends(to: &str, reply: &AgentReply) -> Vec<OutboundSend> {
    let mut sends = Vec::with_capacity(2);
    let text = reply.body();

    if let Some(media) = reply.media() {
        sends.push(OutboundSend::media(
            to,
            media,
            MediaOptions {
                caption: text.map(str::to_string),
                send_audio_as_voice: false,
            },
        ));
    } else if let Some(text) = text {
        sends.push(OutboundSend::text(to, text));
    } else {
        sends.push(OutboundSend::text(to, EMPTY_REPLY_FALLBACK));
    }

    if let Some(audio) = reply.audio() {
        sends.push(OutboundSend::voice_note(to, audio));
    }
    sends
}

#[derive(Clone)]
pub struct InboundRelay {
    agent: Arc<dyn AgentService>,
    outbox: Outbox,
    whitelist: Arc<Whitelist>,
}

impl InboundRelay {
    pub fn new(agent: Arc<dyn AgentService>, outbox: Outbox, whitelist: Whitelist) -> Self {
        Self {
            agent,
            outbox,
            whitelist: Arc::new(whitelist),
        }
    }

    /// Handle one inbound message to completion.
    pub async fn handle(&self, msg: InboundMessage) -> RelayOutcome {
        if let Err(e) = authorize(
            &msg.conversation_id,
            &msg.sender_id,
            msg.is_group,
            &self.whitelist,
        ) {
            debug!("relay: dropping message from {}: {}", msg.sender_id, e);
            return RelayOutcome::Denied;
        }

        info!(
            "relay: message from {}: {}",
            msg.sender_id,
            preview(&msg.body, LOG_PREVIEW_CHARS)
        );

        let conversation = msg.conversation_id.as_str();
        if let Err(e) = self
            .outbox
            .composing(conversation, msg.message_id.as_deref())
            .await
        {
            debug!("relay: composing indicator failed: {}", e);
        }

        let outcome = self.reply(&msg).await;

        if let Err(e) = self.outbox.clear_composing(conversation).await {
            debug!("relay: clearing composing indicator failed: {}", e);
        }
        outcome
    }

    async fn reply(&self, msg: &InboundMessage) -> RelayOutcome {
        let request = AgentRequest {
            sender: msg.agent_sender().to_string(),
            message: msg.body.clone(),
        };

        let reply = match self.agent.ask(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("relay: agent call for {} failed: {}", msg.sender_id, e);
                return self.apologize(&msg.conversation_id).await;
            }
        };

        let sends = plan_reply_sends(&msg.conversation_id, &reply);
        let count = sends.len();
        for send in sends {
            if let Err(e) = self.outbox.send(send).await {
                warn!("relay: delivery to {} failed: {}", msg.conversation_id, e);
                return self.apologize(&msg.conversation_id).await;
            }
        }
        debug!("relay: {} send(s) delivered to {}", count, msg.conversation_id);
        RelayOutcome::Replied { sends: count }
    }

    /// Send the apology line once. A failure here is only logged.
    async fn apologize(&self, to: &str) -> RelayOutcome {
        if let Err(e) = self.outbox.send(OutboundSend::text(to, APOLOGY)).await {
            error!("relay: could not deliver apology to {}: {}", to, e);
        }
        RelayOutcome::Fallback
    }

    /// Dispatch loop: each inbound message is handled on its own task so
    /// different conversations proceed concurrently.
    ///
    /// Returns once the channel is closed, either because every sender was
    /// dropped or because `shutdown` fired. On shutdown, messages already
    /// queued are still handled, and in-flight replies are awaited.
    pub async fn run(
        self,
        mut inbound_rx: mpsc::Receiver<InboundMessage>,
        shutdown: CancellationToken,
    ) {
        info!("relay started, waiting for messages");
        let mut tasks = tokio::task::JoinSet::new();
        let mut closing = false;
        loop {
            tokio::select! {
                () = shutdown.cancelled(), if !closing => {
                    debug!("relay: shutdown requested, draining queued messages");
                    inbound_rx.close();
                    closing = true;
                }
                msg = inbound_rx.recv() => {
                    let Some(msg) = msg else { break };
                    let relay = self.clone();
                    tasks.spawn(async move { relay.handle(msg).await });
                }
                Some(done) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = done {
                        error!("relay task failed: {}", e);
                    }
                }
            }
        }
        if !tasks.is_empty() {
            info!("relay: waiting for {} in-flight message(s)", tasks.len());
        }
        while let Some(done) = tasks.join_next().await {
            if let Err(e) = done {
                error!("relay task failed: {}", e);
            }
        }
        info!("inbound channel closed, relay stopped");
    }
}
