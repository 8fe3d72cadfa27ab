//! ffmpeg invocation variants and the lazily executed probe attempt.

use super::parser::OutputParser;
use super::runner::ToolRunner;
use super::types::{ProbeReport, ProbeResult};
use crate::Error;
use audioprobe_common::AudioFormat;
use once_cell::unsync::OnceCell;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;

/// How ffmpeg is asked to read the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeStrategy {
    /// Copy the audio to the null muxer and let ffmpeg detect the container.
    Default,
    /// Same as [`Default`](Self::Default) with an input format hint.
    ExplicitFormat(AudioFormat),
    /// Declare the format for input and write real output in that format.
    ExplicitFormatForcedOutput(AudioFormat),
}

impl ProbeStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::ExplicitFormat(_) => "explicit_format",
            Self::ExplicitFormatForcedOutput(_) => "explicit_format_forced_output",
        }
    }

    pub fn format(&self) -> Option<AudioFormat> {
        match self {
            Self::Default => None,
            Self::ExplicitFormat(f) | Self::ExplicitFormatForcedOutput(f) => Some(*f),
        }
    }

    /// ffmpeg arguments, program excluded. The path is one discrete argument
    /// and keeps its bytes as stored on disk.
    pub fn args(&self, source: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-xerror", "-loglevel", "info", "-vn"]
            .into_iter()
            .map(OsString::from)
            .collect();
        if let Some(format) = self.format() {
            args.push("-f".into());
            args.push(format.as_str().into());
        }
        args.extend([
            "-i".into(),
            source.as_os_str().to_owned(),
            "-codec".into(),
            "copy".into(),
        ]);
        match self {
            Self::ExplicitFormatForcedOutput(format) => {
                args.extend(["-f".into(), format.as_str().into()]);
            }
            _ => args.extend(["-f".into(), "null".into()]),
        }
        args.push("-".into());
        args
    }
}

impl fmt::Display for ProbeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format() {
            Some(format) => write!(f, "{}({})", self.name(), format),
            None => f.write_str(self.name()),
        }
    }
}

struct Execution {
    stderr: Vec<u8>,
    error: Option<Error>,
}

/// One strategy applied to one file.
///
/// Nothing runs until the output or result is first read; both are then
/// kept for the attempt's lifetime.
pub struct ProbeAttempt<'a> {
    strategy: ProbeStrategy,
    source: &'a Path,
    runner: &'a dyn ToolRunner,
    parser: &'a OutputParser,
    execution: OnceCell<Execution>,
    result: OnceCell<ProbeResult>,
}

impl<'a> ProbeAttempt<'a> {
    pub fn new(
        strategy: ProbeStrategy,
        source: &'a Path,
        runner: &'a dyn ToolRunner,
        parser: &'a OutputParser,
    ) -> Self {
        Self {
            strategy,
            source,
            runner,
            parser,
            execution: OnceCell::new(),
            result: OnceCell::new(),
        }
    }

    pub fn strategy(&self) -> ProbeStrategy {
        self.strategy
    }

    fn execution(&self) -> &Execution {
        self.execution.get_or_init(|| {
            let args = self.strategy.args(self.source);
            tracing::debug!(
                strategy = %self.strategy,
                ffmpeg = self.runner.identifier(),
                args = ?args,
                "running probe"
            );
            match self.runner.run(&args, self.source) {
                Ok(output) => {
                    let error = (!output.success).then(|| {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        let last = stderr.lines().rev().find(|l| !l.trim().is_empty());
                        Error::tool_failed(
                            "ffmpeg",
                            format!(
                                "exited with status {}: {}",
                                output
                                    .code
                                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                                last.unwrap_or("").trim()
                            ),
                        )
                    });
                    Execution {
                        stderr: output.stderr,
                        error,
                    }
                }
                Err(e) => Execution {
                    stderr: Vec::new(),
                    error: Some(e),
                },
            }
        })
    }

    /// Captured diagnostic bytes; runs ffmpeg on first call.
    pub fn raw_output(&self) -> &[u8] {
        &self.execution().stderr
    }

    /// Parsed result; runs and parses on first call.
    pub fn result(&self) -> &ProbeResult {
        self.result
            .get_or_init(|| self.parser.parse(&self.execution().stderr))
    }

    /// Execution-level failure, if the tool could not run or exited non-zero.
    pub fn error(&self) -> Option<&Error> {
        self.execution().error.as_ref()
    }

    /// Whether the parsed result carries every required field.
    ///
    /// The exit status does not count here; it only surfaces as the cause
    /// when an attempt ends incomplete.
    pub fn is_complete(&self) -> bool {
        self.result().is_complete()
    }

    /// Diagnostic record for this attempt.
    pub fn report(&self, attempts: Vec<&'static str>) -> ProbeReport {
        ProbeReport {
            strategy: self.strategy.name(),
            attempts,
            complete: self.is_complete(),
            result: self.result().clone(),
            ffmpeg_version: self.runner.version().map(str::to_string),
            ffmpeg_identifier: self.runner.identifier().to_string(),
        }
    }

    /// Consume the attempt, returning the failure that ended it, if any.
    ///
    /// An execution error takes precedence over a fatal output indicator.
    pub fn into_failure(self) -> Option<Error> {
        let fatal = self.result().fatal.clone();
        let error = self.execution.into_inner().and_then(|e| e.error);
        error.or_else(|| fatal.map(|pattern| Error::FatalOutput { pattern }))
    }
}

impl fmt::Debug for ProbeAttempt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeAttempt")
            .field("strategy", &self.strategy)
            .field("source", &self.source)
            .field("ffmpeg", &self.runner.identifier())
            .field("executed", &self.execution.get().is_some())
            .finish()
    }
}
