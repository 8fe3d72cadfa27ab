use super::BatchRecord;
use audioprobe_av::probe::Seconds;
use audioprobe_common::ProbeStatus;
use serde::Serialize;
use std::collections::BTreeSet;

/// Aggregate counts over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub successful: usize,
    pub errors: usize,
    pub file_not_found: usize,
    /// Sum over successful probes.
    pub total_duration_seconds: Seconds,
    /// Mean over successful probes that reported a bitrate.
    pub avg_bitrate: Option<f64>,
    pub formats_found: Vec<String>,
}

impl BatchSummary {
    pub fn from_records(records: &[BatchRecord]) -> Self {
        let mut summary = Self {
            total_files: records.len(),
            ..Self::default()
        };

        let mut bitrates = Vec::new();
        let mut formats = BTreeSet::new();
        for record in records {
            match record.status {
                ProbeStatus::Success => {
                    summary.successful += 1;
                    if let Some(d) = record.duration {
                        summary.total_duration_seconds = summary.total_duration_seconds + d;
                    }
                    if let Some(b) = record.bitrate {
                        bitrates.push(b as f64);
                    }
                    if let Some(f) = record.format_name {
                        formats.insert(f.to_string());
                    }
                }
                ProbeStatus::Error => summary.errors += 1,
                ProbeStatus::NotFound => summary.file_not_found += 1,
            }
        }

        if !bitrates.is_empty() {
            summary.avg_bitrate = Some(bitrates.iter().sum::<f64>() / bitrates.len() as f64);
        }
        summary.formats_found = formats.into_iter().collect();
        summary
    }

    /// Total duration as `HH:MM:SS`.
    pub fn total_duration_hms(&self) -> String {
        format_hms(self.total_duration_seconds)
    }
}

/// Format whole seconds as `HH:MM:SS`; hours do not wrap.
pub fn format_hms(duration: Seconds) -> String {
    let total = duration.whole_seconds();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
