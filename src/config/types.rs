use audioprobe_av::probe::{ProbeOptions, DEFAULT_ENCODINGS, FALLBACK_FORMAT};
use audioprobe_av::{default_version_table, ResolverSettings, VersionEntry, DEFAULT_VERSION};
use audioprobe_common::AudioFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Version used when none is requested and it is installed
    #[serde(default = "default_version")]
    pub default_version: String,

    /// Version tried after the default
    #[serde(default)]
    pub preferred_version: Option<String>,

    /// Newest-to-oldest fallback order
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,

    /// Prefer container images when docker is reachable
    #[serde(default = "default_true")]
    pub use_docker: bool,

    #[serde(default = "default_docker_path")]
    pub docker_path: PathBuf,

    #[serde(default = "default_version_timeout")]
    pub version_timeout_secs: u64,

    #[serde(default = "default_docker_timeout")]
    pub docker_timeout_secs: u64,

    /// Replaces the built-in version table when non-empty
    #[serde(default)]
    pub versions: Vec<VersionEntry>,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}
fn default_priority() -> Vec<String> {
    audioprobe_av::VERSION_PRIORITY
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_true() -> bool {
    true
}
fn default_docker_path() -> PathBuf {
    PathBuf::from("docker")
}
fn default_version_timeout() -> u64 {
    10
}
fn default_docker_timeout() -> u64 {
    5
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            default_version: default_version(),
            preferred_version: None,
            priority: default_priority(),
            use_docker: true,
            docker_path: default_docker_path(),
            version_timeout_secs: default_version_timeout(),
            docker_timeout_secs: default_docker_timeout(),
            versions: Vec::new(),
        }
    }
}

impl ToolsConfig {
    /// The configured table, or the built-in one.
    pub fn version_table(&self) -> Vec<VersionEntry> {
        if self.versions.is_empty() {
            default_version_table()
        } else {
            self.versions.clone()
        }
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            table: self.version_table(),
            default_version: self.default_version.clone(),
            preferred_version: self.preferred_version.clone(),
            priority: self.priority.clone(),
            use_isolation: self.use_docker,
            docker_program: self.docker_path.clone(),
            docker_timeout: Duration::from_secs(self.docker_timeout_secs),
            version_timeout: Duration::from_secs(self.version_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Encoding labels tried in order when decoding ffmpeg output
    #[serde(default = "default_encodings")]
    pub encodings: Vec<String>,

    /// Container guessed when ffmpeg cannot identify one
    #[serde(default = "default_fallback_format")]
    pub fallback_format: AudioFormat,
}

fn default_encodings() -> Vec<String> {
    DEFAULT_ENCODINGS.iter().map(|s| s.to_string()).collect()
}
fn default_fallback_format() -> AudioFormat {
    FALLBACK_FORMAT
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            encodings: default_encodings(),
            fallback_format: default_fallback_format(),
        }
    }
}

impl ProbeConfig {
    pub fn options(&self) -> ProbeOptions {
        ProbeOptions {
            encodings: self.encodings.clone(),
            fallback_format: self.fallback_format,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Directory default report paths are placed under
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// Files probed concurrently
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("Batch_Probe_Reports")
}
fn default_jobs() -> usize {
    1
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            report_dir: default_report_dir(),
            jobs: default_jobs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Audio service base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Sent as the X-Api-Key header
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

fn default_service_timeout() -> u64 {
    30
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_service_timeout(),
        }
    }
}
