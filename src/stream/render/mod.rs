use std::ops::Range;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

use super::StreamEvent;
use super::sentinel::{Segment, SentinelKind, SentinelReference, tokenize_outside};
use crate::utils::regex::RegexPatterns;

/// Default served location of generated artifacts.
pub const DEFAULT_ARTIFACT_PREFIX: &str = "/temp";

/// Link schemes allowed through sanitization. Relative targets are always kept.
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Turns plain (sentinel-free) text into sanitized markup.
pub trait Formatter: Send + Sync {
    fn format(&self, text: &str) -> String;

    /// Byte ranges of `text` shown verbatim (code), where sentinels are not resolved.
    fn literal_ranges(&self, _text: &str) -> Vec<Range<usize>> {
        Vec::new()
    }
}

/// Markdown to HTML via `pulldown-cmark`.
///
/// Raw HTML in the input is escaped rather than passed through, and link or
/// image targets with a non-allowlisted scheme are replaced with `#`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format(&self, text: &str) -> String {
        let parser = Parser::new_ext(text, markdown_options()).map(sanitize_event);
        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);
        html_output
    }

    fn literal_ranges(&self, text: &str) -> Vec<Range<usize>> {
        Parser::new_ext(text, markdown_options())
            .into_offset_iter()
            .filter_map(|(event, range)| match event {
                Event::Start(Tag::CodeBlock(_)) | Event::Code(_) => Some(range),
                _ => None,
            })
            .collect()
    }
}

fn markdown_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts
}

fn sanitize_event(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let blocked = RegexPatterns::url_scheme()
        .captures(&url)
        .is_some_and(|caps| !SAFE_SCHEMES.contains(&caps[1].to_ascii_lowercase().as_str()));
    if blocked { CowStr::Borrowed("#") } else { url }
}

/// Quoted inline-code annotation appended for a `tool` event.
pub fn tool_annotation(name: &str) -> String {
    let name = name.trim().replace('`', "'");
    format!("\n\n> `🔧 {}`\n\n", name)
}

/// Bold error annotation appended for an `error` event.
pub fn error_annotation(message: &str) -> String {
    format!("\n\n**Error:** {}\n\n", message.trim())
}

/// Renders cumulative response text into markup with media fragments.
///
/// Text is tokenized into plain and sentinel segments first. Only plain
/// segments go through the formatter; sentinels become fragments that
/// point at the served artifact path. Unknown sentinel kinds, and sentinels
/// inside code, remain literal.
#[derive(Debug, Clone)]
pub struct Renderer<F = MarkdownFormatter> {
    formatter: F,
    artifact_prefix: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_ARTIFACT_PREFIX)
    }
}

impl Renderer {
    pub fn new(artifact_prefix: impl Into<String>) -> Self {
        Self::with_formatter(MarkdownFormatter, artifact_prefix)
    }
}

impl<F: Formatter> Renderer<F> {
    pub fn with_formatter(formatter: F, artifact_prefix: impl Into<String>) -> Self {
        Self {
            formatter,
            artifact_prefix: artifact_prefix.into(),
        }
    }

    pub fn render(&self, text: &str) -> String {
        let mut out = String::new();
        let literal = self.formatter.literal_ranges(text);
        for segment in tokenize_outside(text, &literal) {
            match segment {
                Segment::Text(t) if t.trim().is_empty() => {}
                Segment::Text(t) => out.push_str(&self.formatter.format(t)),
                Segment::Sentinel(r) => out.push_str(&self.fragment(&r)),
            }
        }
        out
    }

    /// Markup for one resolved sentinel.
    pub fn fragment(&self, reference: &SentinelReference) -> String {
        let src = reference.served_path(&self.artifact_prefix);
        let src = html_escape::encode_double_quoted_attribute(&src);
        let name = reference.file_name();
        match reference.kind {
            SentinelKind::AudioReply => format!(
                "<div class=\"media-artifact audio\"><audio controls src=\"{}\"></audio></div>\n",
                src
            ),
            SentinelKind::ScreenshotTaken => format!(
                "<figure class=\"media-artifact image\"><img src=\"{}\" alt=\"{}\"><figcaption>{}</figcaption></figure>\n",
                src,
                html_escape::encode_double_quoted_attribute(name),
                html_escape::encode_text(name)
            ),
        }
    }
}

/// Output accumulated over one response stream.
///
/// `text` only ever grows; `html` is the latest full render of `text`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderState {
    pub text: String,
    pub html: String,
}

impl RenderState {
    /// Apply one event. Returns `true` when the text changed and the
    /// markup was re-rendered.
    pub fn apply<F: Formatter>(&mut self, event: &StreamEvent, renderer: &Renderer<F>) -> bool {
        match event {
            StreamEvent::Token { content } => {
                if content.is_empty() {
                    return false;
                }
                self.text.push_str(content);
            }
            StreamEvent::Tool { content } => self.text.push_str(&tool_annotation(content)),
            StreamEvent::Error { content } => self.text.push_str(&error_annotation(content)),
            StreamEvent::Done { .. } => return false,
        }
        self.html = renderer.render(&self.text);
        true
    }
}
