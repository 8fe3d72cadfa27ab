//! Probe one file with several ffmpeg builds side by side.

use super::types::{ProbeReport, ProbeRequest};
use super::{probe_with_resolver, ProbeOptions};
use crate::tools::VersionResolver;
use crate::Error;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    Success,
    Error,
    Unavailable,
}

/// Outcome of probing with one version.
#[derive(Debug, Clone, Serialize)]
pub struct VersionComparison {
    pub version: String,
    pub status: ComparisonStatus,
    pub complete: bool,
    pub warnings_count: usize,
    pub report: Option<ProbeReport>,
    pub error: Option<String>,
}

/// Probe `source` once per version. An empty list means every available version.
///
/// Failures are recorded per version; one missing build never stops the rest.
pub fn compare_versions(
    resolver: &VersionResolver,
    source: &Path,
    versions: &[String],
    options: &ProbeOptions,
) -> Vec<VersionComparison> {
    let versions = if versions.is_empty() {
        resolver.available_versions()
    } else {
        versions.to_vec()
    };

    versions
        .into_iter()
        .map(|version| {
            let request = ProbeRequest::new(source).with_version(&version);
            match probe_with_resolver(resolver, &request, options) {
                Ok(report) => VersionComparison {
                    status: ComparisonStatus::Success,
                    complete: report.complete,
                    warnings_count: report.result.warnings.len(),
                    report: Some(report),
                    error: None,
                    version,
                },
                Err(e) => {
                    let status = match e {
                        Error::VersionUnavailable { .. } | Error::NoToolAvailable => {
                            ComparisonStatus::Unavailable
                        }
                        _ => ComparisonStatus::Error,
                    };
                    tracing::debug!(version = %version, error = %e, "version comparison failed");
                    VersionComparison {
                        status,
                        complete: false,
                        warnings_count: 0,
                        report: None,
                        error: Some(e.to_string()),
                        version,
                    }
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ResolverSettings, VersionEntry};

    #[test]
    fn test_unavailable_versions_do_not_abort() {
        let resolver = VersionResolver::new(ResolverSettings {
            table: vec![VersionEntry::new("7.1.0", "/nonexistent/7.1.0/ffmpeg", None)],
            use_isolation: false,
            ..ResolverSettings::default()
        });
        let file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
        let results = compare_versions(
            &resolver,
            file.path(),
            &["7.1.0".to_string(), "9.9.9".to_string()],
            &ProbeOptions::default(),
        );
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.status == ComparisonStatus::Unavailable && !r.complete));
        assert_eq!(results[1].version, "9.9.9");
    }

    #[test]
    fn test_empty_list_with_nothing_installed() {
        let resolver = VersionResolver::new(ResolverSettings {
            table: vec![],
            use_isolation: false,
            ..ResolverSettings::default()
        });
        let results = compare_versions(&resolver, Path::new("x.mp3"), &[], &ProbeOptions::default());
        assert!(results.is_empty());
    }
}
