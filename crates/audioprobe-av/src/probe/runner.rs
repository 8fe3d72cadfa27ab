//! The seam between probe strategies and the process that runs ffmpeg.

use crate::command::ToolOutput;
use crate::tools::ResolvedTool;
use crate::Result;
use std::ffi::OsString;
use std::path::Path;

/// Runs one ffmpeg invocation for a probe attempt.
pub trait ToolRunner: Send + Sync {
    /// Run ffmpeg with `args` (program excluded). `source` is the file the
    /// arguments refer to.
    fn run(&self, args: &[OsString], source: &Path) -> Result<ToolOutput>;

    /// Version table identifier of the tool.
    fn identifier(&self) -> &str;

    /// Version string the tool reported.
    fn version(&self) -> Option<&str> {
        None
    }
}

/// Runs a resolved ffmpeg, natively or in a container.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    tool: ResolvedTool,
}

impl FfmpegRunner {
    pub fn new(tool: ResolvedTool) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> &ResolvedTool {
        &self.tool
    }
}

impl ToolRunner for FfmpegRunner {
    fn run(&self, args: &[OsString], source: &Path) -> Result<ToolOutput> {
        self.tool
            .location
            .command(args, Some(source))
            .discard_stdout()
            .execute()
    }

    fn identifier(&self) -> &str {
        &self.tool.id
    }

    fn version(&self) -> Option<&str> {
        self.tool.version.as_deref()
    }
}
