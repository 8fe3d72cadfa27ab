//! Core type definitions for audio formats and probe outcomes.
//!
//! Enums serialize in lowercase so they match the container tokens ffmpeg
//! prints and accepts on its command line.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Audio container formats the prober recognizes.
///
/// Declaration order is the whitelist order. When ffmpeg reports a
/// comma-separated demuxer list, the first entry found in this set wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Free Lossless Audio Codec.
    Flac,
    /// MPEG-1/2 Audio Layer III.
    Mp3,
    /// MPEG-4 audio.
    M4a,
    /// Ogg container.
    Ogg,
    /// RIFF WAVE.
    Wav,
}

impl AudioFormat {
    /// Every whitelisted format, in whitelist order.
    pub const ALL: [AudioFormat; 5] = [
        AudioFormat::Flac,
        AudioFormat::Mp3,
        AudioFormat::M4a,
        AudioFormat::Ogg,
        AudioFormat::Wav,
    ];

    /// The ffmpeg format token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Ogg => "ogg",
            Self::Wav => "wav",
        }
    }

    /// Mime type derived from the format token.
    pub fn mime_type(&self) -> String {
        format!("audio/{}", self.as_str())
    }

    /// Pick the first entry of a comma-separated format list that is whitelisted.
    ///
    /// Entries are matched exactly, left to right; unknown entries are skipped.
    ///
    /// ```
    /// use audioprobe_common::AudioFormat;
    ///
    /// assert_eq!(AudioFormat::from_format_list("vorbis,ogg"), Some(AudioFormat::Ogg));
    /// assert_eq!(AudioFormat::from_format_list("mov,mp4,m4a,3gp"), Some(AudioFormat::M4a));
    /// assert_eq!(AudioFormat::from_format_list("aiff"), None);
    /// ```
    pub fn from_format_list(list: &str) -> Option<Self> {
        list.split(',')
            .map(str::trim)
            .find_map(|entry| entry.parse().ok())
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flac" => Ok(Self::Flac),
            "mp3" => Ok(Self::Mp3),
            "m4a" => Ok(Self::M4a),
            "ogg" => Ok(Self::Ogg),
            "wav" => Ok(Self::Wav),
            other => Err(Error::unsupported_format(other)),
        }
    }
}

/// Outcome of probing one file in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeStatus {
    /// Every required field was recovered.
    Success,
    /// The strategy ladder was exhausted or the tool failed.
    Error,
    /// The file disappeared between discovery and probing.
    #[serde(rename = "File Not Found")]
    NotFound,
}

impl ProbeStatus {
    /// Label written to reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Error => "Error",
            Self::NotFound => "File Not Found",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Success" => Ok(Self::Success),
            "Error" => Ok(Self::Error),
            "File Not Found" => Ok(Self::NotFound),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}
