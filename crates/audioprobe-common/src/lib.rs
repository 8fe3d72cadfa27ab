//! Audioprobe-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across audioprobe:
//!
//! - **Core Types**: The audio container whitelist and per-file probe status
//! - **Path Utilities**: Functions to detect audio files by extension
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use audioprobe_common::{AudioFormat, ProbeStatus};
//! use audioprobe_common::paths::is_audio_file;
//! use std::path::Path;
//!
//! let format: AudioFormat = "flac".parse().unwrap();
//! assert_eq!(format.mime_type(), "audio/flac");
//!
//! assert!(is_audio_file(Path::new("track.mp3")));
//! assert_eq!(ProbeStatus::NotFound.to_string(), "File Not Found");
//! ```

pub mod error;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
