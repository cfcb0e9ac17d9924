//! Shared audio submission contract.
//!
//! Size and duration limits plus the accepted MIME types for recitation
//! audio. Both the recorder client and the transcription service enforce
//! the same limits from here so the two ends cannot drift apart.

/// Maximum accepted upload size in bytes (10 MB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Minimum decoded audio duration in seconds.
///
/// Anything shorter is treated as an accidental tap, not a recitation.
pub const MIN_DURATION_SECS: f64 = 0.5;

/// Maximum decoded audio duration in seconds.
pub const MAX_DURATION_SECS: f64 = 180.0;

/// Accepted MIME types mapped to their storage file extension.
///
/// Browsers and OS recorders disagree on exact type strings for the same
/// container, so common aliases map to one canonical extension.
const ALLOWED_AUDIO_TYPES: &[(&str, &str)] = &[
    ("audio/wav", "wav"),
    ("audio/x-wav", "wav"),
    ("audio/wave", "wav"),
    ("audio/mpeg", "mp3"),
    ("audio/mp3", "mp3"),
    ("audio/mp4", "m4a"),
    ("audio/m4a", "m4a"),
    ("audio/x-m4a", "m4a"),
    ("audio/ogg", "ogg"),
    ("application/ogg", "ogg"),
    ("audio/flac", "flac"),
    ("audio/x-flac", "flac"),
    ("audio/webm", "webm"),
    // Sniffers report webm containers as video even when they hold audio
    ("video/webm", "webm"),
];

/// Strip MIME parameters (";codecs=opus" etc.) and normalize case.
fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

/// Whether this content type is accepted for recitation uploads.
pub fn is_allowed_mime(mime: &str) -> bool {
    canonical_mime(mime).is_some()
}

/// Canonical form of an accepted content type, stripped of parameters.
///
/// Returns `None` for types outside the allow list; callers use this
/// both to validate and to get a stable string for storage.
pub fn canonical_mime(mime: &str) -> Option<&'static str> {
    let essence = essence(mime);
    ALLOWED_AUDIO_TYPES
        .iter()
        .find(|(m, _)| *m == essence)
        .map(|(m, _)| *m)
}

/// Storage extension for an accepted content type, "bin" when unknown.
pub fn extension_for_mime(mime: &str) -> &'static str {
    let essence = essence(mime);
    ALLOWED_AUDIO_TYPES
        .iter()
        .find(|(m, _)| *m == essence)
        .map(|(_, ext)| *ext)
        .unwrap_or("bin")
}

/// Canonical content type for a file extension, for uploads read from disk.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    ALLOWED_AUDIO_TYPES
        .iter()
        .find(|(_, e)| *e == ext)
        .map(|(m, _)| *m)
}
