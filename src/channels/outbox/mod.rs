//! Serialized send path in front of a chat transport.
//!
//! Transports may not tolerate overlapping calls, so every outbound
//! operation (sends and composing indicators alike) is queued to a single
//! worker task that owns the transport handle. Callers wait on a oneshot
//! for their own result; the HTTP layer and relay tasks stay concurrent.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::base::ChatTransport;
use crate::bus::OutboundSend;
use crate::errors::BridgeError;

/// Queue depth before callers start waiting for space.
const QUEUE_CAPACITY: usize = 64;

enum Job {
    Send(OutboundSend),
    Composing {
        conversation_id: String,
        message_id: Option<String>,
    },
    ClearComposing {
        conversation_id: String,
    },
}

struct Envelope {
    job: Job,
    reply: oneshot::Sender<anyhow::Result<()>>,
}

/// Cloneable handle to the single-writer send worker.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::Sender<Envelope>,
}

impl Outbox {
    /// Start the worker. It stops once every `Outbox` clone is dropped.
    pub fn spawn(transport: Arc<dyn ChatTransport>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let handle = tokio::spawn(run_worker(transport, rx));
        (Self { tx }, handle)
    }

    pub async fn send(&self, send: OutboundSend) -> Result<(), BridgeError> {
        self.submit(Job::Send(send)).await
    }

    pub async fn composing(
        &self,
        conversation_id: &str,
        message_id: Option<&str>,
    ) -> Result<(), BridgeError> {
        self.submit(Job::Composing {
            conversation_id: conversation_id.to_string(),
            message_id: message_id.map(str::to_string),
        })
        .await
    }

    pub async fn clear_composing(&self, conversation_id: &str) -> Result<(), BridgeError> {
        self.submit(Job::ClearComposing {
            conversation_id: conversation_id.to_string(),
        })
        .await
    }

    async fn submit(&self, job: Job) -> Result<(), BridgeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { job, reply })
            .await
            .map_err(|_| BridgeError::TransportSend("outbox worker stopped".into()))?;
        match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(BridgeError::TransportSend(format!("{:#}", e))),
            Err(_) => Err(BridgeError::TransportSend(
                "outbox worker dropped the request".into(),
            )),
        }
    }
}

async fn run_worker(transport: Arc<dyn ChatTransport>, mut rx: mpsc::Receiver<Envelope>) {
    while let Some(Envelope { job, reply }) = rx.recv().await {
        let result = match job {
            Job::Send(send) => {
                if transport.is_ready() {
                    transport.send(&send).await
                } else {
                    Err(anyhow::anyhow!("{} transport is not ready", transport.name()))
                }
            }
            Job::Composing {
                conversation_id,
                message_id,
            } => {
                transport
                    .send_composing(&conversation_id, message_id.as_deref())
                    .await
            }
            Job::ClearComposing { conversation_id } => {
                transport.clear_composing(&conversation_id).await
            }
        };
        if let Err(e) = &result {
            warn!("{} outbound call failed: {:#}", transport.name(), e);
        }
        if reply.send(result).is_err() {
            debug!("outbox caller went away before its result");
        }
    }
    debug!("outbox worker stopped");
}
