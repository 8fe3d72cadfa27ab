//! Probe request, parsed field and result types.

use audioprobe_common::AudioFormat;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// What to probe and with which tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    /// File to probe.
    pub source: PathBuf,
    /// Container format the caller already knows, used for the explicit-format step.
    pub declared_format: Option<AudioFormat>,
    /// ffmpeg version identifier; `None` selects the best available.
    pub tool_version: Option<String>,
}

impl ProbeRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            declared_format: None,
            tool_version: None,
        }
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.declared_format = Some(format);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = Some(version.into());
        self
    }
}

/// Named capture groups the parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Comma-separated demuxer names from the `Input #0` line.
    Formats,
    /// Bitrate from the `Duration:` line (or the final size line when forcing output).
    FileBitrate,
    /// Bitrate from the audio stream line.
    StreamBitrate,
    /// `mono` or `stereo`.
    Channels,
    /// `H:MM:SS.ff` from the last progress line.
    Duration,
}

impl Field {
    /// Regex capture group name.
    pub fn group_name(&self) -> &'static str {
        match self {
            Self::Formats => "formats",
            Self::FileBitrate => "file_br",
            Self::StreamBitrate => "stream_br",
            Self::Channels => "channels",
            Self::Duration => "duration",
        }
    }

    pub fn from_group_name(name: &str) -> Option<Self> {
        match name {
            "formats" => Some(Self::Formats),
            "file_br" => Some(Self::FileBitrate),
            "stream_br" => Some(Self::StreamBitrate),
            "channels" => Some(Self::Channels),
            "duration" => Some(Self::Duration),
            _ => None,
        }
    }
}

/// Raw strings captured by the field rules.
///
/// Later rules overwrite earlier ones on the same field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedFields(BTreeMap<Field, String>);

impl ParsedFields {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn insert(&mut self, field: Field, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Fixed-point seconds with two decimal places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Seconds {
    hundredths: u64,
}

impl Seconds {
    pub const ZERO: Seconds = Seconds { hundredths: 0 };

    pub fn from_hundredths(hundredths: u64) -> Self {
        Self { hundredths }
    }

    pub fn hundredths(&self) -> u64 {
        self.hundredths
    }

    pub fn whole_seconds(&self) -> u64 {
        self.hundredths / 100
    }

    pub fn as_f64(&self) -> f64 {
        self.hundredths as f64 / 100.0
    }

    /// Parse an ffmpeg `H:MM:SS.ff` timestamp.
    ///
    /// Fractions longer than two digits are rounded half-to-even.
    ///
    /// ```
    /// use audioprobe_av::probe::Seconds;
    ///
    /// assert_eq!(Seconds::parse_timestamp("01:02:03.45").unwrap().to_string(), "3723.45");
    /// assert!(Seconds::parse_timestamp("03.45").is_none());
    /// ```
    pub fn parse_timestamp(s: &str) -> Option<Self> {
        let mut parts = s.trim().split(':');
        let (hours, minutes, secs) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        let hours = parse_digits(hours)?;
        let minutes = parse_digits(minutes)?;
        let (whole, fraction) = secs.split_once('.').unwrap_or((secs, ""));
        let whole = parse_digits(whole)?;
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let total = (hours * 3600 + minutes * 60 + whole) * 100 + round_hundredths(fraction);
        Some(Self::from_hundredths(total))
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn round_hundredths(fraction: &str) -> u64 {
    let digit = |i: usize| {
        fraction
            .as_bytes()
            .get(i)
            .map(|b| u64::from(b - b'0'))
            .unwrap_or(0)
    };
    let kept = digit(0) * 10 + digit(1);
    let rest = fraction.get(2..).unwrap_or("");
    match rest.as_bytes().first() {
        None => kept,
        Some(b) if *b > b'5' => kept + 1,
        Some(b) if *b < b'5' => kept,
        Some(_) if rest[1..].bytes().any(|b| b != b'0') => kept + 1,
        Some(_) => kept + kept % 2,
    }
}

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.hundredths / 100, self.hundredths % 100)
    }
}

impl Serialize for Seconds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl std::ops::Add for Seconds {
    type Output = Seconds;

    fn add(self, rhs: Seconds) -> Seconds {
        Seconds::from_hundredths(self.hundredths + rhs.hundredths)
    }
}

impl std::iter::Sum for Seconds {
    fn sum<I: Iterator<Item = Seconds>>(iter: I) -> Seconds {
        iter.fold(Seconds::ZERO, |acc, s| acc + s)
    }
}

/// Map an ffmpeg channel layout token to a channel count.
pub fn channel_count(layout: &str) -> Option<u8> {
    match layout {
        "mono" => Some(1),
        "stereo" => Some(2),
        _ => None,
    }
}

/// Values derived from one attempt's diagnostic output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProbeResult {
    /// Kilobits per second; stream level preferred over file level.
    pub bitrate: Option<u32>,
    pub channels: Option<u8>,
    pub duration: Option<Seconds>,
    pub format_name: Option<AudioFormat>,
    pub mime_type: Option<String>,
    /// Distinct diagnostic lines that hint at damage or misdetection.
    pub warnings: Vec<String>,
    /// Pattern of the fatal indicator that matched, if any.
    pub fatal: Option<String>,
    /// Decoded diagnostic text; absent when empty or undecodable.
    #[serde(rename = "raw")]
    pub raw_output: Option<String>,
}

impl ProbeResult {
    /// Derive the result from captured fields.
    pub fn derive(
        fields: &ParsedFields,
        raw_output: Option<String>,
        warnings: Vec<String>,
        fatal: Option<String>,
    ) -> Self {
        let bitrate = fields
            .get(Field::StreamBitrate)
            .or_else(|| fields.get(Field::FileBitrate))
            .and_then(|br| br.parse().ok());
        let format_name = fields
            .get(Field::Formats)
            .and_then(AudioFormat::from_format_list);

        Self {
            bitrate,
            channels: fields.get(Field::Channels).and_then(channel_count),
            duration: fields.get(Field::Duration).and_then(Seconds::parse_timestamp),
            format_name,
            mime_type: format_name.map(|f| f.mime_type()),
            warnings,
            fatal,
            raw_output,
        }
    }

    /// Every required field present and no fatal indicator.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty() && self.fatal.is_none()
    }

    /// Names of required fields that were not recovered.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.bitrate.is_none() {
            missing.push("bitrate");
        }
        if self.channels.is_none() {
            missing.push("channels");
        }
        if self.duration.is_none() {
            missing.push("duration");
        }
        if self.format_name.is_none() {
            missing.push("format_name");
        }
        if self.mime_type.is_none() {
            missing.push("mime_type");
        }
        if self.raw_output.is_none() {
            missing.push("raw");
        }
        missing
    }
}

/// Final (or last) attempt of a probe ladder, with tool identity.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    /// Strategy that produced `result`.
    pub strategy: &'static str,
    /// Strategies run, in order.
    pub attempts: Vec<&'static str>,
    pub complete: bool,
    #[serde(flatten)]
    pub result: ProbeResult,
    /// Version string reported by the tool.
    pub ffmpeg_version: Option<String>,
    /// Version table identifier the tool was resolved from.
    pub ffmpeg_identifier: String,
}
