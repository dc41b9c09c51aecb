use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::stream::sentinel::{self, SentinelKind};

/// A message received from the chat transport. Consumed once by the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Transport-qualified sender (`<digits>@c.us`).
    pub sender_id: String,
    pub sender_display_name: Option<String>,
    pub body: String,
    /// Transport-qualified conversation (`<digits>@c.us` or `<id>@g.us`).
    pub conversation_id: String,
    pub is_group: bool,
    /// Transport message id, used for read receipts and typing indicators.
    pub message_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// A direct (one-to-one) message whose conversation is the sender.
    pub fn direct(sender_id: impl Into<String>, body: impl Into<String>) -> Self {
        let sender_id = sender_id.into();
        Self {
            conversation_id: sender_id.clone(),
            sender_id,
            sender_display_name: None,
            body: body.into(),
            is_group: false,
            message_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Name sent to the agent: display name when known, else the sender id.
    pub fn agent_sender(&self) -> &str {
        self.sender_display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(self.sender_id.as_str())
    }
}

/// Body of the synchronous agent call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub sender: String,
    pub message: String,
}

/// Structured agent answer. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    #[serde(default, rename = "reply", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, rename = "media", skip_serializing_if = "Option::is_none")]
    pub media_path: Option<String>,
    #[serde(
        default,
        rename = "audio_reply",
        alias = "audio",
        skip_serializing_if = "Option::is_none"
    )]
    pub audio_path: Option<String>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

impl AgentReply {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Reply text, `None` when absent or whitespace-only.
    pub fn body(&self) -> Option<&str> {
        non_blank(self.text.as_ref())
    }

    pub fn media(&self) -> Option<&str> {
        non_blank(self.media_path.as_ref())
    }

    pub fn audio(&self) -> Option<&str> {
        non_blank(self.audio_path.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.body().is_none() && self.media().is_none() && self.audio().is_none()
    }

    /// Lift `[SCREENSHOT_TAKEN: p]` / `[AUDIO_REPLY: p]` markers out of the
    /// text into the media and audio fields, when those are not already set.
    ///
    /// Chat transports cannot render markers, so known ones are always
    /// removed from the text.
    #[must_use]
    pub fn lift_sentinels(mut self) -> Self {
        let Some(text) = self.text.take() else {
            return self;
        };
        let (cleaned, refs) = sentinel::extract(&text);
        for r in refs {
            let slot = match r.kind {
                SentinelKind::ScreenshotTaken => &mut self.media_path,
                SentinelKind::AudioReply => &mut self.audio_path,
            };
            if non_blank(slot.as_ref()).is_none() {
                *slot = Some(r.value);
            }
        }
        self.text = Some(cleaned);
        self
    }
}

/// Backend-initiated push through the bridge. Fire-and-forget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundPushRequest {
    /// Destination; plain digits are qualified by the transport.
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, rename = "mediaPath", skip_serializing_if = "Option::is_none")]
    pub media_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaOptions {
    pub caption: Option<String>,
    /// Deliver audio as a push-to-talk voice note.
    pub send_audio_as_voice: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendContent {
    Text(String),
    Media { path: PathBuf, options: MediaOptions },
}

/// One send handed to the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSend {
    pub to: String,
    pub content: SendContent,
}

impl OutboundSend {
    pub fn text(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            content: SendContent::Text(body.into()),
        }
    }

    pub fn media(to: impl Into<String>, path: impl Into<PathBuf>, options: MediaOptions) -> Self {
        Self {
            to: to.into(),
            content: SendContent::Media {
                path: path.into(),
                options,
            },
        }
    }

    pub fn voice_note(to: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::media(
            to,
            path,
            MediaOptions {
                caption: None,
                send_audio_as_voice: true,
            },
        )
    }
}
