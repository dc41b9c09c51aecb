use std::io::Write;

use tracing::debug;

use crate::stream::render::RenderState;
use crate::stream::{Failure, View};

/// Prints streamed text as it arrives.
///
/// Rendered markup is kept for `--output`; the terminal gets the raw text
/// deltas.
pub(crate) struct TerminalView<W: Write + Send> {
    out: W,
    printed: usize,
    busy: bool,
    failure: Option<Failure>,
    html: String,
}

impl<W: Write + Send> TerminalView<W> {
    pub(crate) fn new(out: W) -> Self {
        Self {
            out,
            printed: 0,
            busy: false,
            failure: None,
            html: String::new(),
        }
    }

    pub(crate) fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub(crate) fn html(&self) -> &str {
        &self.html
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy
    }

    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> View for TerminalView<W> {
    fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
        if !busy && self.printed > 0 {
            let _ = writeln!(self.out);
        }
    }

    fn update(&mut self, render: &RenderState) {
        // text only grows, so everything past `printed` is new
        if let Some(delta) = render.text.get(self.printed..) {
            if let Err(e) = self.out.write_all(delta.as_bytes()).and_then(|()| self.out.flush()) {
                debug!("terminal write failed: {}", e);
            }
            self.printed = render.text.len();
        }
        self.html.clone_from(&render.html);
    }

    fn show_failure(&mut self, failure: &Failure) {
        self.failure = Some(failure.clone());
    }
}
