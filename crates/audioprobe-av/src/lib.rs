//! # audioprobe-av
//!
//! ffmpeg-backed audio inspection.
//!
//! This crate provides functionality for:
//! - Locating ffmpeg builds by version, natively or in a container
//! - Running ffmpeg with structured argument lists and bounded auxiliary checks
//! - Parsing ffmpeg's diagnostic stream into bitrate, channels, duration and format
//! - Escalating through probe strategies until a complete result is found
//!
//! ## Example
//!
//! ```no_run
//! use audioprobe_av::probe::{probe_with_resolver, ProbeOptions, ProbeRequest};
//! use audioprobe_av::VersionResolver;
//!
//! let resolver = VersionResolver::default();
//! let request = ProbeRequest::new("/music/track.flac");
//! let report = probe_with_resolver(&resolver, &request, &ProbeOptions::default())?;
//! println!("{:?} {:?} kb/s", report.result.format_name, report.result.bitrate);
//! # Ok::<(), audioprobe_av::Error>(())
//! ```

pub mod command;
mod error;
pub mod probe;
pub mod tools;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use probe::{ProbeOrchestrator, ProbeReport, ProbeRequest, ProbeResult, ProbeStrategy};
pub use tools::{
    default_version_table, ResolvedTool, ResolverSettings, ToolInfo, ToolLocation, VersionEntry,
    VersionInfo, VersionResolver, DEFAULT_VERSION, VERSION_PRIORITY,
};
