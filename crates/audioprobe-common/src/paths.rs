//! Path utilities for detecting audio files by extension.
//!
//! Batch discovery uses these to decide which files under a directory tree
//! are handed to the prober.

use std::path::Path;

/// List of supported audio file extensions.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "m4a", "ogg", "wav"];

/// Check if a path has an audio file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use audioprobe_common::paths::is_audio_file;
///
/// assert!(is_audio_file(Path::new("track.flac")));
/// assert!(is_audio_file(Path::new("/path/to/Track.MP3")));
/// assert!(!is_audio_file(Path::new("cover.jpg")));
/// ```
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Get the list of audio file extensions.
#[must_use]
pub fn audio_extensions() -> &'static [&'static str] {
    AUDIO_EXTENSIONS
}
