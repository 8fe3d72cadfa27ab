//! Regex-based parsing of ffmpeg's diagnostic stream.

use super::types::{Field, ParsedFields, ProbeResult};
use crate::{Error, Result};
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;

/// Encodings tried in order when none are configured.
pub const DEFAULT_ENCODINGS: &[&str] = &["utf-8", "latin1"];

/// Index of the file-bitrate rule in the default rule set.
pub const FILE_BITRATE_RULE: usize = 1;

static FIELD_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?m)^Input #0, (?P<formats>[\w,]+)",
        r"(?m)^\s+Duration:.*bitrate: (?P<file_br>[0-9]+) kb/s",
        r"(?m)^\s+Stream.*(?P<channels>mono|stereo)",
        r"(?m)^\s+Stream.*, (?P<stream_br>[0-9]+) kb/s",
        r"(?ms)size=.*time=(?P<duration>\d+:\d{2}:\d{2}\.\d{2}) ",
    ])
});

// With a real output format ffmpeg prints the rate on the final size line.
static FORCED_OUTPUT_BITRATE_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)size.*bitrate= (?P<file_br>[0-9]+)\.[0-9]kbits").unwrap()
});

static FATAL_RULES: Lazy<Vec<Regex>> = Lazy::new(|| compile(&[r"Input/output error"]));

static WARNING_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"detected only with low score",
        r"misdetection possible",
        r"Invalid data found",
        r"corrupt",
        r"Truncating packet",
        r"Header missing",
        r"Estimating duration",
        r"unknown/unknown",
        r"start: [^0]",
        r"\\x[0-9a-f]{2}",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
}

/// Outcome of decoding captured bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// Text and the name of the encoding that produced it.
    Text {
        text: Cow<'a, str>,
        encoding: &'static str,
    },
    /// No configured encoding accepted the bytes.
    Undecodable,
}

/// Turns captured stderr bytes into a [`ProbeResult`].
///
/// Field rules are applied in order and each match is merged into the
/// field map, so a later rule capturing the same group replaces an earlier
/// one.
#[derive(Debug, Clone)]
pub struct OutputParser {
    encodings: Vec<&'static Encoding>,
    field_rules: Vec<Regex>,
    fatal_rules: Vec<Regex>,
    warning_rules: Vec<Regex>,
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputParser {
    /// Parser with the default rule set, decoding UTF-8 then Latin-1.
    pub fn new() -> Self {
        Self {
            encodings: vec![encoding_rs::UTF_8, encoding_rs::WINDOWS_1252],
            field_rules: FIELD_RULES.clone(),
            fatal_rules: FATAL_RULES.clone(),
            warning_rules: WARNING_RULES.clone(),
        }
    }

    /// Parser for invocations that write a real output format.
    pub fn forced_output() -> Self {
        Self::new().replace_field_rule(FILE_BITRATE_RULE, FORCED_OUTPUT_BITRATE_RULE.clone())
    }

    /// Replace the field rule at `index`; out-of-range indexes append.
    pub fn replace_field_rule(mut self, index: usize, rule: Regex) -> Self {
        match self.field_rules.get_mut(index) {
            Some(slot) => *slot = rule,
            None => self.field_rules.push(rule),
        }
        self
    }

    /// Use the given encoding labels, in order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for an empty list or an unknown label.
    pub fn with_encodings<S: AsRef<str>>(mut self, labels: &[S]) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::InvalidInput("no text encodings configured".into()));
        }
        self.encodings = labels
            .iter()
            .map(|label| {
                Encoding::for_label(label.as_ref().as_bytes()).ok_or_else(|| {
                    Error::InvalidInput(format!("unknown text encoding: {}", label.as_ref()))
                })
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Names of the configured encodings, in order.
    pub fn encodings(&self) -> Vec<&'static str> {
        self.encodings.iter().map(|e| e.name()).collect()
    }

    /// Decode with the first encoding that accepts the bytes without replacement.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Decoded<'a> {
        for encoding in &self.encodings {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes)
            {
                return Decoded::Text {
                    text,
                    encoding: encoding.name(),
                };
            }
        }
        Decoded::Undecodable
    }

    /// Merge every matching field rule's named groups, in rule order.
    pub fn extract_fields(&self, text: &str) -> ParsedFields {
        let mut fields = ParsedFields::default();
        for rule in &self.field_rules {
            let Some(caps) = rule.captures(text) else {
                continue;
            };
            for name in rule.capture_names().flatten() {
                if let (Some(field), Some(m)) = (Field::from_group_name(name), caps.name(name)) {
                    fields.insert(field, m.as_str());
                }
            }
        }
        fields
    }

    /// Pattern of the first fatal rule that matches.
    pub fn detect_fatal(&self, text: &str) -> Option<String> {
        self.fatal_rules
            .iter()
            .find(|rule| rule.is_match(text))
            .map(|rule| rule.as_str().to_string())
    }

    /// Whole trimmed lines matched by any warning rule, first occurrence only.
    pub fn extract_warnings(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut warnings = Vec::new();
        for rule in &self.warning_rules {
            for line in text.lines().filter(|line| rule.is_match(line)) {
                let line = line.trim();
                if seen.insert(line) {
                    warnings.push(line.to_string());
                }
            }
        }
        warnings
    }

    /// Parse captured bytes. Never fails: empty or undecodable input yields
    /// an incomplete result with every derived field absent.
    pub fn parse(&self, bytes: &[u8]) -> ProbeResult {
        let text = match self.decode(bytes) {
            Decoded::Text { text, .. } if !text.is_empty() => text,
            Decoded::Text { .. } => return ProbeResult::default(),
            Decoded::Undecodable => {
                tracing::debug!(len = bytes.len(), "diagnostic output is undecodable");
                return ProbeResult::default();
            }
        };

        let fields = self.extract_fields(&text);
        let warnings = self.extract_warnings(&text);
        let fatal = self.detect_fatal(&text);
        ProbeResult::derive(&fields, Some(text.into_owned()), warnings, fatal)
    }
}
