//! audioprobe - ffmpeg-based audio file inspection
//!
//! This library crate exposes the batch, report and service layers for
//! integration testing.

pub mod batch;
pub mod config;
pub mod report;
pub mod service;
