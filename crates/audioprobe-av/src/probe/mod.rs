//! Audio file probing through ffmpeg's diagnostic output.
//!
//! A probe runs ffmpeg over the source with a copy codec, captures stderr,
//! and scrapes the container, bitrate, channel layout and duration from it:
//!
//! - [`OutputParser`] decodes and pattern-matches the captured bytes
//! - [`ProbeStrategy`] builds the three ffmpeg invocations
//! - [`ProbeOrchestrator`] escalates through the strategies
//! - [`compare_versions`] repeats a probe across ffmpeg builds

mod compare;
mod orchestrator;
mod parser;
mod runner;
mod strategy;
mod types;

pub use compare::{compare_versions, ComparisonStatus, VersionComparison};
pub use orchestrator::{ProbeOrchestrator, FALLBACK_FORMAT};
pub use parser::{Decoded, OutputParser, DEFAULT_ENCODINGS, FILE_BITRATE_RULE};
pub use runner::{FfmpegRunner, ToolRunner};
pub use strategy::{ProbeAttempt, ProbeStrategy};
pub use types::*;

use crate::tools::{ResolvedTool, VersionResolver};
use crate::Result;
use audioprobe_common::AudioFormat;

/// Parser and ladder settings shared by every probe in a run.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Text encoding labels tried in order.
    pub encodings: Vec<String>,
    /// Container guessed for the explicit-format step.
    pub fallback_format: AudioFormat,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            encodings: DEFAULT_ENCODINGS.iter().map(|s| s.to_string()).collect(),
            fallback_format: FALLBACK_FORMAT,
        }
    }
}

/// Build an orchestrator around an already resolved ffmpeg.
pub fn orchestrator_for(
    tool: ResolvedTool,
    options: &ProbeOptions,
) -> Result<ProbeOrchestrator<FfmpegRunner>> {
    Ok(ProbeOrchestrator::new(FfmpegRunner::new(tool))
        .with_encodings(options.encodings.as_slice())?
        .with_fallback_format(options.fallback_format))
}

/// Resolve the request's ffmpeg version, then run the ladder.
pub fn probe_with_resolver(
    resolver: &VersionResolver,
    request: &ProbeRequest,
    options: &ProbeOptions,
) -> Result<ProbeReport> {
    let tool = resolver.resolve(request.tool_version.as_deref())?;
    orchestrator_for(tool, options)?.probe(request)
}
