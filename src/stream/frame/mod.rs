use tracing::debug;

use super::StreamEvent;
use crate::errors::BridgeError;

const DATA_PREFIX: &str = "data:";

/// Parse one complete line of the stream.
///
/// Returns `Ok(None)` for lines that carry no event (blank separators,
/// `:` comments, `event:`/`id:` fields), and `Err(MalformedFrame)` for a
/// `data:` line whose payload is not a valid event.
pub fn parse_line(line: &str) -> Result<Option<StreamEvent>, BridgeError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    serde_json::from_str(payload)
        .map(Some)
        .map_err(|e| BridgeError::MalformedFrame(e.to_string()))
}

/// Longest line held back waiting for its newline.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental decoder for `data: <json>\n\n` response bodies.
///
/// Bytes are buffered until a newline arrives, so a frame (or a multi-byte
/// character) split across reads decodes exactly as if it arrived whole.
/// A line that outgrows the cap is discarded through its newline and
/// counted as dropped.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    /// Bytes of `buf` already known to hold no newline.
    scanned: usize,
    max_line: usize,
    /// Skipping the remainder of an oversized line.
    discarding: bool,
    dropped: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            max_line,
            discarding: false,
            dropped: 0,
        }
    }

    /// Feed one chunk; returns every event completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        let mut start = 0;
        let mut scan = self.scanned;
        while let Some(offset) = self.buf[scan..].iter().position(|&b| b == b'\n') {
            let end = scan + offset;
            if self.discarding {
                self.discarding = false;
            } else if let Some(event) = self.decode(start, end) {
                events.push(event);
            }
            start = end + 1;
            scan = start;
        }
        self.buf.drain(..start);
        self.scanned = self.buf.len();

        if self.buf.len() > self.max_line {
            if !self.discarding {
                self.dropped += 1;
                debug!(
                    "dropping stream line longer than {} bytes",
                    self.max_line
                );
                self.discarding = true;
            }
            self.buf.clear();
            self.scanned = 0;
        }
        events
    }

    /// Flush a trailing line that never got its newline (end of body).
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let discarding = std::mem::take(&mut self.discarding);
        if self.buf.is_empty() || discarding {
            self.buf.clear();
            self.scanned = 0;
            return None;
        }
        let event = self.decode(0, self.buf.len());
        self.buf.clear();
        self.scanned = 0;
        event
    }

    /// Number of `data:` lines discarded as malformed or oversized so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn decode(&mut self, start: usize, end: usize) -> Option<StreamEvent> {
        let line = String::from_utf8_lossy(&self.buf[start..end]);
        match parse_line(&line) {
            Ok(event) => event,
            Err(e) => {
                self.dropped += 1;
                debug!("dropping stream frame: {}", e);
                None
            }
        }
    }
}
