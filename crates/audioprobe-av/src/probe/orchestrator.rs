//! The fixed escalation ladder over probe strategies.

use super::parser::OutputParser;
use super::runner::ToolRunner;
use super::strategy::{ProbeAttempt, ProbeStrategy};
use super::types::{ProbeReport, ProbeRequest};
use crate::{Error, Result};
use audioprobe_common::AudioFormat;
use std::path::Path;

/// Container guessed for the explicit-format step when none is declared.
pub const FALLBACK_FORMAT: AudioFormat = AudioFormat::Mp3;

/// Runs strategies in a fixed order until one yields a complete result.
///
/// 1. [`ProbeStrategy::Default`].
/// 2. If incomplete but a format was recovered,
///    [`ProbeStrategy::ExplicitFormatForcedOutput`] with that format.
/// 3. If still incomplete, [`ProbeStrategy::ExplicitFormat`] with the
///    declared format or the fallback guess.
///
/// No strategy is retried and the order never changes. An attempt succeeds
/// on a complete parse alone, whatever ffmpeg's exit status.
#[derive(Debug)]
pub struct ProbeOrchestrator<R> {
    runner: R,
    parser: OutputParser,
    forced_parser: OutputParser,
    fallback_format: AudioFormat,
}

impl<R: ToolRunner> ProbeOrchestrator<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            parser: OutputParser::new(),
            forced_parser: OutputParser::forced_output(),
            fallback_format: FALLBACK_FORMAT,
        }
    }

    /// Decode diagnostic output with these encoding labels, in order.
    pub fn with_encodings<S: AsRef<str>>(mut self, labels: &[S]) -> Result<Self> {
        self.parser = self.parser.with_encodings(labels)?;
        self.forced_parser = self.forced_parser.with_encodings(labels)?;
        Ok(self)
    }

    pub fn with_fallback_format(mut self, format: AudioFormat) -> Self {
        self.fallback_format = format;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// An unexecuted attempt of `strategy` against `source`.
    pub fn attempt<'a>(&'a self, strategy: ProbeStrategy, source: &'a Path) -> ProbeAttempt<'a> {
        let parser = match strategy {
            ProbeStrategy::ExplicitFormatForcedOutput(_) => &self.forced_parser,
            _ => &self.parser,
        };
        ProbeAttempt::new(strategy, source, &self.runner, parser)
    }

    /// Probe a file with default options.
    pub fn probe_path(&self, source: impl AsRef<Path>) -> Result<ProbeReport> {
        self.probe(&ProbeRequest::new(source.as_ref()))
    }

    /// Run the ladder for `request`.
    ///
    /// # Errors
    ///
    /// - [`Error::FileNotFound`] if the source does not exist.
    /// - [`Error::ProbeFailed`] if the last attempt failed to execute or
    ///   reported a fatal condition; the cause is chained.
    /// - [`Error::Unprobeable`] if every attempt was merely incomplete.
    pub fn probe(&self, request: &ProbeRequest) -> Result<ProbeReport> {
        let source = request.source.as_path();
        if !source.exists() {
            return Err(Error::file_not_found(source));
        }

        let mut attempts = Vec::with_capacity(3);

        let default = self.attempt(ProbeStrategy::Default, source);
        attempts.push(default.strategy().name());
        if default.is_complete() {
            return Ok(default.report(attempts));
        }

        if let Some(format) = default.result().format_name {
            let forced = self.attempt(ProbeStrategy::ExplicitFormatForcedOutput(format), source);
            attempts.push(forced.strategy().name());
            if forced.is_complete() {
                return Ok(forced.report(attempts));
            }
        }

        let format = request.declared_format.unwrap_or(self.fallback_format);
        let last = self.attempt(ProbeStrategy::ExplicitFormat(format), source);
        attempts.push(last.strategy().name());
        if last.is_complete() {
            return Ok(last.report(attempts));
        }

        let report = last.report(attempts);
        tracing::warn!(
            path = %source.display(),
            missing = ?report.result.missing_fields(),
            record = %serde_json::to_string(&report).unwrap_or_default(),
            "probe ladder exhausted"
        );

        let strategy = last.strategy().to_string();
        match last.into_failure() {
            Some(cause) => Err(Error::ProbeFailed {
                path: source.to_path_buf(),
                strategy,
                source: Box::new(cause),
            }),
            None => Err(Error::Unprobeable {
                path: source.to_path_buf(),
            }),
        }
    }
}
