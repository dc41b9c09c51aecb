use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::frame::FrameDecoder;
use super::render::{Formatter, RenderState, Renderer};
use super::StreamEvent;
use crate::errors::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Receiving,
    /// `done` received or body exhausted.
    Done,
    /// Read failed mid-stream; partial output kept.
    Errored,
    /// Stopped by the caller's cancellation token.
    Aborted,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Errored | Self::Aborted)
    }
}

/// Failure surfaced next to the output, never inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Request could not be made or the stream broke.
    Network(String),
    /// Server answered with an error payload.
    Rejected(String),
}

impl From<&BridgeError> for Failure {
    fn from(err: &BridgeError) -> Self {
        match err {
            BridgeError::Rejected { message, .. } => Self::Rejected(message.clone()),
            err if err.is_network() => Self::Network(err.to_string()),
            err => Self::Rejected(err.to_string()),
        }
    }
}

/// Surface that displays a streamed response.
pub trait View: Send {
    /// Toggle the "thinking"/input-disabled state.
    fn set_busy(&mut self, busy: bool);
    /// Called after every event that changed the output.
    fn update(&mut self, render: &RenderState);
    fn show_failure(&mut self, failure: &Failure);
}

/// Marks a view busy for its lifetime and restores it to ready on drop.
///
/// This is the single finalization point: every exit path of a chat
/// request (success, rejection, read failure, abort, early return) goes
/// through the drop.
pub struct Busy<'a, V: View + ?Sized> {
    view: &'a mut V,
}

impl<'a, V: View + ?Sized> Busy<'a, V> {
    pub fn new(view: &'a mut V) -> Self {
        view.set_busy(true);
        Self { view }
    }
}

impl<V: View + ?Sized> Deref for Busy<'_, V> {
    type Target = V;

    fn deref(&self) -> &V {
        self.view
    }
}

impl<V: View + ?Sized> DerefMut for Busy<'_, V> {
    fn deref_mut(&mut self) -> &mut V {
        self.view
    }
}

impl<V: View + ?Sized> Drop for Busy<'_, V> {
    fn drop(&mut self) {
        self.view.set_busy(false);
    }
}

/// Result of consuming one response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub state: StreamState,
    pub render: RenderState,
    pub dropped_frames: usize,
}

/// Decoder plus render state for one response stream.
pub struct StreamSession<'r, F: Formatter> {
    renderer: &'r Renderer<F>,
    decoder: FrameDecoder,
    render: RenderState,
    state: StreamState,
}

impl<'r, F: Formatter> StreamSession<'r, F> {
    pub fn new(renderer: &'r Renderer<F>) -> Self {
        Self {
            renderer,
            decoder: FrameDecoder::new(),
            render: RenderState::default(),
            state: StreamState::Idle,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn render(&self) -> &RenderState {
        &self.render
    }

    /// Feed one chunk. Returns `true` once the stream reached a terminal state.
    pub fn feed<V: View + ?Sized>(&mut self, chunk: &[u8], view: &mut V) -> bool {
        if self.state.is_terminal() {
            return true;
        }
        self.state = StreamState::Receiving;
        for event in self.decoder.push(chunk) {
            if self.dispatch(&event, view) {
                return true;
            }
        }
        false
    }

    /// Body exhausted: parse any trailing line, then complete normally.
    pub fn finish<V: View + ?Sized>(&mut self, view: &mut V) {
        if self.state.is_terminal() {
            return;
        }
        if let Some(event) = self.decoder.finish() {
            self.dispatch(&event, view);
        }
        self.state = StreamState::Done;
    }

    /// Read failure: keep what was rendered, report through the view.
    pub fn fail<V: View + ?Sized>(&mut self, err: &BridgeError, view: &mut V) {
        warn!("chat stream interrupted: {}", err);
        self.state = StreamState::Errored;
        view.show_failure(&Failure::from(err));
    }

    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.state = StreamState::Aborted;
        }
    }

    pub fn into_outcome(self) -> StreamOutcome {
        StreamOutcome {
            state: self.state,
            dropped_frames: self.decoder.dropped(),
            render: self.render,
        }
    }

    fn dispatch<V: View + ?Sized>(&mut self, event: &StreamEvent, view: &mut V) -> bool {
        if event.is_done() {
            self.state = StreamState::Done;
            return true;
        }
        if self.render.apply(event, self.renderer) {
            view.update(&self.render);
        }
        false
    }
}

/// Drive a chunked response body through a session until it terminates.
///
/// Cancellation wins over a ready chunk, so an abort never applies further
/// output.
pub async fn consume<S, B, E, F, V>(
    chunks: S,
    renderer: &Renderer<F>,
    view: &mut V,
    cancel: &CancellationToken,
) -> StreamOutcome
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
    F: Formatter,
    V: View + ?Sized,
{
    let mut session = StreamSession::new(renderer);
    let mut chunks = std::pin::pin!(chunks);

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("chat stream aborted by caller");
                session.abort();
                break;
            }
            next = chunks.next() => next,
        };
        match next {
            Some(Ok(bytes)) => {
                if session.feed(bytes.as_ref(), view) {
                    break;
                }
            }
            Some(Err(e)) => {
                session.fail(&BridgeError::StreamRead(e.to_string()), view);
                break;
            }
            None => {
                session.finish(view);
                break;
            }
        }
    }

    let outcome = session.into_outcome();
    if outcome.dropped_frames > 0 {
        debug!("chat stream dropped {} malformed frame(s)", outcome.dropped_frames);
    }
    outcome
}

#[cfg(test)]
mod tests;
