// Shared test helpers; not all items used by every test binary.
#![allow(unused)]

use async_trait::async_trait;
use clawbridge::bus::OutboundSend;
use clawbridge::channels::ChatTransport;
use clawbridge::stream::View;
use clawbridge::stream::render::RenderState;
use clawbridge::stream::Failure;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Transport that keeps every send in memory.
#[derive(Default)]
pub struct MemoryTransport {
    sends: Mutex<Vec<OutboundSend>>,
    composing: Mutex<Vec<String>>,
    stopped: AtomicBool,
}

impl MemoryTransport {
    pub fn sends(&self) -> Vec<OutboundSend> {
        self.sends.lock().unwrap().clone()
    }

    pub fn composing(&self) -> Vec<String> {
        self.composing.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.stopped.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    async fn send(&self, send: &OutboundSend) -> anyhow::Result<()> {
        self.sends.lock().unwrap().push(send.clone());
        Ok(())
    }

    async fn send_composing(
        &self,
        conversation_id: &str,
        _message_id: Option<&str>,
    ) -> anyhow::Result<()> {
        self.composing
            .lock()
            .unwrap()
            .push(conversation_id.to_string());
        Ok(())
    }
}

/// View that records every update.
#[derive(Default)]
pub struct RecordingView {
    pub busy_changes: Vec<bool>,
    pub renders: Vec<RenderState>,
    pub failures: Vec<Failure>,
}

impl View for RecordingView {
    fn set_busy(&mut self, busy: bool) {
        self.busy_changes.push(busy);
    }

    fn update(&mut self, render: &RenderState) {
        self.renders.push(render.clone());
    }

    fn show_failure(&mut self, failure: &Failure) {
        self.failures.push(failure.clone());
    }
}

/// Encode events as a `data: <json>\n\n` body.
pub fn sse_body(events: &[serde_json::Value]) -> String {
    events
        .iter()
        .map(|e| format!("data: {}\n\n", e))
        .collect()
}
