//! In-memory transport for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::base::ChatTransport;
use crate::bus::OutboundSend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send(OutboundSend),
    Composing(String),
    ClearComposing(String),
}

#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    not_ready: AtomicBool,
    failing_sends: AtomicUsize,
    fail_composing: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Make the next `n` sends fail.
    pub fn fail_next_sends(&self, n: usize) {
        self.failing_sends.store(n, Ordering::SeqCst);
    }

    pub fn fail_composing(&self) {
        self.fail_composing.store(true, Ordering::SeqCst);
    }

    pub fn set_ready(&self, ready: bool) {
        self.not_ready.store(!ready, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends(&self) -> Vec<OutboundSend> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.set_ready(true);
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.set_ready(false);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        !self.not_ready.load(Ordering::SeqCst)
    }

    async fn send(&self, send: &OutboundSend) -> anyhow::Result<()> {
        self.enter().await;
        let failing = self
            .failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            anyhow::bail!("simulated send failure");
        }
        self.calls.lock().unwrap().push(Call::Send(send.clone()));
        Ok(())
    }

    async fn send_composing(
        &self,
        conversation_id: &str,
        _message_id: Option<&str>,
    ) -> anyhow::Result<()> {
        if self.fail_composing.load(Ordering::SeqCst) {
            anyhow::bail!("simulated composing failure");
        }
        self.calls
            .lock()
            .unwrap()
            .push(Call::Composing(conversation_id.to_string()));
        Ok(())
    }

    async fn clear_composing(&self, conversation_id: &str) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::ClearComposing(conversation_id.to_string()));
        Ok(())
    }
}
