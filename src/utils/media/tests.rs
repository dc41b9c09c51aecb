use super::*;

// --- is_audio_path ---

#[test]
fn test_audio_extensions() {
    for name in ["a.mp3", "b.ogg", "c.wav", "d.m4a", "e.opus"] {
        assert!(is_audio_path(name), "{name} should be audio");
    }
}

#[test]
fn test_audio_extension_case_insensitive() {
    assert!(is_audio_path("/tmp/NOTE.OGG"));
}

#[test]
fn test_non_audio() {
    assert!(!is_audio_path("x.jpg"));
    assert!(!is_audio_path("README"));
    assert!(!is_audio_path("mp3"));
}

// --- media_kind ---

#[test]
fn test_media_kind() {
    assert_eq!(media_kind("shot.png"), MediaKind::Image);
    assert_eq!(media_kind("shot.JPEG"), MediaKind::Image);
    assert_eq!(media_kind("voice.ogg"), MediaKind::Audio);
    assert_eq!(media_kind("clip.mp4"), MediaKind::Video);
    assert_eq!(media_kind("report.pdf"), MediaKind::Document);
    assert_eq!(media_kind("noext"), MediaKind::Document);
}

// --- mime_from_extension ---

#[test]
fn test_mime_types() {
    assert_eq!(mime_from_extension("a.jpg"), "image/jpeg");
    assert_eq!(mime_from_extension("a.mp3"), "audio/mpeg");
    assert_eq!(mime_from_extension("a.opus"), "audio/ogg");
    assert_eq!(mime_from_extension("a.bin"), "application/octet-stream");
}
