use std::path::Path;

/// File extensions sent as voice notes rather than generic media.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "ogg", "wav", "m4a", "opus"];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "3gp", "webm"];

/// Broad media category, used to pick the transport message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Document,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Document => "document",
        }
    }
}

fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Whether the path names an audio file (by extension, case-insensitive).
pub fn is_audio_path(path: impl AsRef<Path>) -> bool {
    extension_lower(path.as_ref()).is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

pub fn media_kind(path: impl AsRef<Path>) -> MediaKind {
    let Some(ext) = extension_lower(path.as_ref()) else {
        return MediaKind::Document;
    };
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Image
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Audio
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Video
    } else {
        MediaKind::Document
    }
}

/// Map a file extension to the MIME type declared on upload.
pub fn mime_from_extension(path: impl AsRef<Path>) -> &'static str {
    match extension_lower(path.as_ref()).as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp3") => "audio/mpeg",
        Some("ogg" | "opus") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("mp4") => "video/mp4",
        Some("3gp") => "video/3gpp",
        Some("webm") => "video/webm",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests;
