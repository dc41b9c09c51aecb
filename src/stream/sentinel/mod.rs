//! Sentinel references: inline `[KIND:value]` markers naming generated media.
//!
//! Text is split into plain and sentinel segments *before* any formatting so
//! that markdown processing can never wrap or escape a marker. Markers that
//! sit inside a caller-supplied literal range (code spans and blocks) are
//! left as text.

use std::fmt;
use std::ops::Range;

use crate::utils::regex::RegexPatterns;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelKind {
    /// Generated speech; rendered as an audio player, sent as a voice note.
    AudioReply,
    /// Captured image; rendered as a captioned image, sent as media.
    ScreenshotTaken,
}

impl SentinelKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "AUDIO_REPLY" => Some(Self::AudioReply),
            "SCREENSHOT_TAKEN" => Some(Self::ScreenshotTaken),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AudioReply => "AUDIO_REPLY",
            Self::ScreenshotTaken => "SCREENSHOT_TAKEN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelReference {
    pub kind: SentinelKind,
    /// Filesystem path as written by the agent, whitespace-trimmed.
    pub value: String,
}

impl SentinelReference {
    pub fn new(kind: SentinelKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Final path component, accepting both `/` and `\` separators.
    pub fn file_name(&self) -> &str {
        self.value
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.value.as_str())
    }

    /// Path under which the artifact is served, e.g. `/temp/clip1.mp3`.
    pub fn served_path(&self, prefix: &str) -> String {
        format!(
            "{}/{}",
            prefix.trim_end_matches('/'),
            urlencoding::encode(self.file_name())
        )
    }
}

impl fmt::Display for SentinelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}: {}]", self.kind.as_str(), self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Sentinel(SentinelReference),
}

/// Split `text` into ordered plain-text and sentinel segments.
///
/// Markers with an unknown kind or an empty value stay inside the surrounding
/// text segment. Adjacent text is never split into two segments.
pub fn tokenize(text: &str) -> Vec<Segment<'_>> {
    tokenize_outside(text, &[])
}

/// [`tokenize`], keeping markers that start inside any of `literal` as text.
pub fn tokenize_outside<'a>(text: &'a str, literal: &[Range<usize>]) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in RegexPatterns::sentinel().captures_iter(text) {
        let (Some(whole), Some(kind), Some(value)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let Some(kind) = SentinelKind::parse(kind.as_str()) else {
            continue;
        };
        if value.as_str().is_empty() || literal.iter().any(|r| r.contains(&whole.start())) {
            continue;
        }
        if whole.start() > last {
            segments.push(Segment::Text(&text[last..whole.start()]));
        }
        segments.push(Segment::Sentinel(SentinelReference::new(
            kind,
            value.as_str(),
        )));
        last = whole.end();
    }

    if last < text.len() {
        segments.push(Segment::Text(&text[last..]));
    }
    segments
}

/// Remove every known sentinel from `text`, returning the cleaned text and
/// the references in order of appearance.
pub fn extract(text: &str) -> (String, Vec<SentinelReference>) {
    let mut cleaned = String::with_capacity(text.len());
    let mut refs = Vec::new();
    for segment in tokenize(text) {
        match segment {
            Segment::Text(t) => cleaned.push_str(t),
            Segment::Sentinel(r) => refs.push(r),
        }
    }
    (cleaned.trim().to_string(), refs)
}
