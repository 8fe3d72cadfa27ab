//! Directory-wide probing.
//!
//! Discovers audio files under a directory, probes each one through a shared
//! [`ProbeOrchestrator`], and records one row per file. A single file's
//! failure is recorded and the run continues.

mod summary;

pub use summary::{format_hms, BatchSummary};

use anyhow::{Context, Result};
use audioprobe_av::probe::{ProbeOrchestrator, Seconds, ToolRunner};
use audioprobe_common::paths::is_audio_file;
use audioprobe_common::{AudioFormat, ProbeStatus};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the library-mode batch holding files directly under the root.
pub const INDIVIDUAL_FILES: &str = "individual_files";

/// One probed (or unprobeable) file.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord {
    /// Path relative to the batch root.
    pub file_path: String,
    pub status: ProbeStatus,
    pub bitrate: Option<u32>,
    pub channels: Option<u8>,
    pub duration: Option<Seconds>,
    pub format_name: Option<AudioFormat>,
    pub mime_type: Option<String>,
    pub warnings: Vec<String>,
    pub file_size_bytes: Option<u64>,
    pub ffmpeg_version: Option<String>,
    pub ffmpeg_identifier: Option<String>,
    pub error_message: Option<String>,
    pub absolute_path: PathBuf,
    pub probe_raw_output: Option<String>,
}

impl BatchRecord {
    fn failed(
        file_path: String,
        absolute_path: PathBuf,
        status: ProbeStatus,
        message: String,
    ) -> Self {
        Self {
            file_path,
            status,
            bitrate: None,
            channels: None,
            duration: None,
            format_name: None,
            mime_type: None,
            warnings: Vec::new(),
            file_size_bytes: None,
            ffmpeg_version: None,
            ffmpeg_identifier: None,
            error_message: Some(message),
            absolute_path,
            probe_raw_output: None,
        }
    }
}

/// Records in discovery order plus their summary.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub records: Vec<BatchRecord>,
    pub summary: BatchSummary,
}

/// A named group of files probed and reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub name: String,
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Recursively collect audio files under `dir`, sorted by path.
///
/// Entries that cannot be read (an unreadable subdirectory, a file removed
/// mid-walk) are logged and skipped.
pub fn discover_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Input directory does not exist: {:?}", dir);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(skip_unreadable)
        .filter(|e| e.file_type().is_file() && is_audio_file(e.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    Ok(files)
}

fn skip_unreadable(entry: walkdir::Result<walkdir::DirEntry>) -> Option<walkdir::DirEntry> {
    match entry {
        Ok(entry) => Some(entry),
        Err(err) => {
            tracing::warn!(
                path = ?err.path(),
                error = %err,
                "Skipping unreadable entry"
            );
            None
        }
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Split a library root into one job per immediate subdirectory plus one for
/// loose files. Hidden subdirectories and jobs without audio files are
/// skipped; a subdirectory that cannot be walked is logged and skipped.
pub fn plan_library(root: &Path) -> Result<Vec<BatchJob>> {
    if !root.is_dir() {
        anyhow::bail!("Library directory does not exist: {:?}", root);
    }

    let mut dirs = Vec::new();
    let mut loose = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(skip_unreadable)
    {
        if entry.file_type().is_dir() {
            if !is_hidden(&entry) {
                dirs.push(entry.into_path());
            }
        } else if entry.file_type().is_file() && is_audio_file(entry.path()) {
            loose.push(entry.into_path());
        }
    }
    dirs.sort();
    loose.sort();

    let mut jobs = Vec::new();
    for dir in dirs {
        let files = match discover_audio_files(&dir) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("Skipping library folder {:?}: {:#}", dir, e);
                continue;
            }
        };
        if files.is_empty() {
            continue;
        }
        jobs.push(BatchJob {
            name: folder_name(&dir),
            root: dir,
            files,
        });
    }
    if !loose.is_empty() {
        jobs.push(BatchJob {
            name: INDIVIDUAL_FILES.to_string(),
            root: root.to_path_buf(),
            files: loose,
        });
    }
    Ok(jobs)
}

/// Last path component, used to name reports.
pub fn folder_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "root".to_string())
}

/// Probes every file of a batch with one resolved ffmpeg.
pub struct BatchRunner<'a, R> {
    orchestrator: &'a ProbeOrchestrator<R>,
    jobs: usize,
}

impl<'a, R: ToolRunner> BatchRunner<'a, R> {
    pub fn new(orchestrator: &'a ProbeOrchestrator<R>) -> Self {
        Self {
            orchestrator,
            jobs: 1,
        }
    }

    /// Files probed concurrently; 0 uses one per CPU.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        self
    }

    /// Discover and probe every audio file under `dir`.
    pub fn run(&self, dir: &Path) -> Result<BatchOutcome> {
        let files = discover_audio_files(dir)?;
        tracing::info!("Found {} audio files in {:?}", files.len(), dir);
        self.run_files(dir, &files)
    }

    /// Probe a prepared job.
    pub fn run_job(&self, job: &BatchJob) -> Result<BatchOutcome> {
        tracing::info!("Processing {} ({} files)", job.name, job.files.len());
        self.run_files(&job.root, &job.files)
    }

    /// Probe `files`, naming them relative to `root`. Order is preserved.
    pub fn run_files(&self, root: &Path, files: &[PathBuf]) -> Result<BatchOutcome> {
        let total = files.len();
        let records: Vec<BatchRecord> = if self.jobs > 1 && total > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.jobs)
                .build()
                .context("Failed to build probe worker pool")?;
            pool.install(|| {
                files
                    .par_iter()
                    .enumerate()
                    .map(|(i, path)| self.process_file(root, path, i + 1, total))
                    .collect()
            })
        } else {
            files
                .iter()
                .enumerate()
                .map(|(i, path)| self.process_file(root, path, i + 1, total))
                .collect()
        };

        let summary = BatchSummary::from_records(&records);
        Ok(BatchOutcome { records, summary })
    }

    fn process_file(&self, root: &Path, path: &Path, index: usize, total: usize) -> BatchRecord {
        let file_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();
        let absolute_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        tracing::info!("Processing {}/{}: {}", index, total, file_path);

        let file_size_bytes = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("File not found: {:?}", path);
                return BatchRecord::failed(
                    file_path,
                    absolute_path,
                    ProbeStatus::NotFound,
                    "File not found".to_string(),
                );
            }
            Err(e) => {
                return BatchRecord::failed(
                    file_path,
                    absolute_path,
                    ProbeStatus::Error,
                    e.to_string(),
                );
            }
        };

        match self.orchestrator.probe_path(path) {
            Ok(report) => {
                let result = report.result;
                BatchRecord {
                    file_path,
                    status: ProbeStatus::Success,
                    bitrate: result.bitrate,
                    channels: result.channels,
                    duration: result.duration,
                    format_name: result.format_name,
                    mime_type: result.mime_type,
                    warnings: result.warnings,
                    file_size_bytes: Some(file_size_bytes),
                    ffmpeg_version: report.ffmpeg_version,
                    ffmpeg_identifier: Some(report.ffmpeg_identifier),
                    error_message: None,
                    absolute_path,
                    probe_raw_output: result.raw_output,
                }
            }
            Err(e) => {
                let status = if e.is_file_not_found() {
                    ProbeStatus::NotFound
                } else {
                    ProbeStatus::Error
                };
                tracing::warn!("Failed to probe {}: {}", file_path, e);
                let mut record = BatchRecord::failed(file_path, absolute_path, status, e.to_string());
                record.file_size_bytes = Some(file_size_bytes);
                record
            }
        }
    }
}
