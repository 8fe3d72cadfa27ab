//! CSV batch reports and the console summary.

use crate::batch::{BatchRecord, BatchSummary};
use anyhow::{Context, Result};
use audioprobe_common::ProbeStatus;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const REPORT_SUFFIX: &str = "_ffmpeg_probe_report.csv";

/// Report columns in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    FilePath,
    Status,
    Bitrate,
    Channels,
    Duration,
    FormatName,
    MimeType,
    Warnings,
    FileSizeBytes,
    FfmpegVersion,
    FfmpegIdentifier,
    ErrorMessage,
    AbsolutePath,
    ProbeRawOutput,
}

impl Column {
    pub const ALL: [Column; 14] = [
        Column::FilePath,
        Column::Status,
        Column::Bitrate,
        Column::Channels,
        Column::Duration,
        Column::FormatName,
        Column::MimeType,
        Column::Warnings,
        Column::FileSizeBytes,
        Column::FfmpegVersion,
        Column::FfmpegIdentifier,
        Column::ErrorMessage,
        Column::AbsolutePath,
        Column::ProbeRawOutput,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::FilePath => "file_path",
            Self::Status => "status",
            Self::Bitrate => "bitrate",
            Self::Channels => "channels",
            Self::Duration => "duration",
            Self::FormatName => "format_name",
            Self::MimeType => "mime_type",
            Self::Warnings => "warnings",
            Self::FileSizeBytes => "file_size_bytes",
            Self::FfmpegVersion => "ffmpeg_version",
            Self::FfmpegIdentifier => "ffmpeg_identifier",
            Self::ErrorMessage => "error_message",
            Self::AbsolutePath => "absolute_path",
            Self::ProbeRawOutput => "probe_raw_output",
        }
    }

    fn always_present(&self) -> bool {
        matches!(self, Self::FilePath | Self::Status)
    }

    /// Cell value; `None` leaves the cell empty.
    pub fn value(&self, record: &BatchRecord) -> Option<String> {
        match self {
            Self::FilePath => Some(record.file_path.clone()),
            Self::Status => Some(record.status.to_string()),
            Self::Bitrate => record.bitrate.map(|b| b.to_string()),
            Self::Channels => record.channels.map(|c| c.to_string()),
            Self::Duration => record.duration.map(|d| d.to_string()),
            Self::FormatName => record.format_name.map(|f| f.to_string()),
            Self::MimeType => record.mime_type.clone(),
            // Successful rows always carry the column, even with no warnings.
            Self::Warnings => {
                (record.status == ProbeStatus::Success).then(|| record.warnings.join("; "))
            }
            Self::FileSizeBytes => record.file_size_bytes.map(|s| s.to_string()),
            Self::FfmpegVersion => record.ffmpeg_version.clone(),
            Self::FfmpegIdentifier => record.ffmpeg_identifier.clone(),
            Self::ErrorMessage => record.error_message.clone(),
            Self::AbsolutePath => Some(record.absolute_path.to_string_lossy().to_string()),
            Self::ProbeRawOutput => record.probe_raw_output.clone(),
        }
    }
}

/// Columns emitted for `records`: the fixed pair plus any column some row populates.
pub fn columns_for(records: &[BatchRecord]) -> Vec<Column> {
    Column::ALL
        .into_iter()
        .filter(|c| c.always_present() || records.iter().any(|r| c.value(r).is_some()))
        .collect()
}

/// `<report_dir>/<folder>_ffmpeg_probe_report.csv`
pub fn default_report_path(report_dir: &Path, folder: &str) -> PathBuf {
    report_dir.join(format!("{}{}", folder, REPORT_SUFFIX))
}

/// Write `records` as CSV to any writer.
pub fn write_csv_to<W: Write>(records: &[BatchRecord], writer: W) -> Result<()> {
    let columns = columns_for(records);
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(columns.iter().map(Column::name))?;
    for record in records {
        wtr.write_record(
            columns
                .iter()
                .map(|c| c.value(record).unwrap_or_default()),
        )?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `records` to `path`, creating parent directories.
pub fn write_csv(records: &[BatchRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {:?}", parent))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report {:?}", path))?;
    write_csv_to(records, file).with_context(|| format!("Failed to write report {:?}", path))?;
    tracing::info!("Wrote {} rows to {:?}", records.len(), path);
    Ok(())
}

/// Human-readable batch summary.
pub fn format_summary(summary: &BatchSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total files:      {}\n", summary.total_files));
    out.push_str(&format!("Successful:       {}\n", summary.successful));
    out.push_str(&format!("Errors:           {}\n", summary.errors));
    out.push_str(&format!("File not found:   {}\n", summary.file_not_found));
    out.push_str(&format!(
        "Total duration:   {} ({}s)\n",
        summary.total_duration_hms(),
        summary.total_duration_seconds
    ));
    match summary.avg_bitrate {
        Some(avg) => out.push_str(&format!("Average bitrate:  {:.1} kb/s\n", avg)),
        None => out.push_str("Average bitrate:  n/a\n"),
    }
    if summary.formats_found.is_empty() {
        out.push_str("Formats found:    none\n");
    } else {
        out.push_str(&format!(
            "Formats found:    {}\n",
            summary.formats_found.join(", ")
        ));
    }
    out
}
