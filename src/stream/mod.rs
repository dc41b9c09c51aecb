//! Streaming chat responses: `data: <json>` frame decoding, incremental
//! rendering with sentinel media, and the client session driving a view.

pub mod client;
pub mod frame;
pub mod render;
pub mod sentinel;
pub mod session;

use serde::{Deserialize, Serialize};

pub use client::WebChatClient;
pub use frame::FrameDecoder;
pub use render::{MarkdownFormatter, Renderer};
pub use session::{Failure, StreamOutcome, StreamState, View};

/// One event of a chat response stream.
///
/// Wire shape is `{"type": "token", "content": "..."}`; `done` may omit `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Token { content: String },
    Tool { content: String },
    Error { content: String },
    Done {
        #[serde(default)]
        content: String,
    },
}

impl StreamEvent {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}
