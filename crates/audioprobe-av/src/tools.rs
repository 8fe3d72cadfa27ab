//! ffmpeg version table, availability detection and resolution.

use crate::command::ToolCommand;
use crate::{Error, Result};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Version used when nothing else is requested and it is installed.
pub const DEFAULT_VERSION: &str = "5.1.6";

/// Newest-to-oldest walk used by best-available selection.
pub const VERSION_PRIORITY: &[&str] = &["8.0.0", "7.1.0", "5.1.6", "system", "homebrew"];

/// Mount point for the source directory inside an isolated container.
pub const CONTAINER_MOUNT: &str = "/audio";

const TOOL: &str = "ffmpeg";

/// One known ffmpeg build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Identifier used on the command line and in reports.
    pub id: String,
    /// Native executable. A bare file name is looked up on `PATH`.
    pub path: PathBuf,
    /// Container image providing the same build.
    #[serde(default)]
    pub image: Option<String>,
}

impl VersionEntry {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, image: Option<&str>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            image: image.map(str::to_string),
        }
    }

    fn is_path_lookup(&self) -> bool {
        self.path.components().count() == 1 && !self.path.is_absolute()
    }
}

/// The built-in table of known ffmpeg builds.
pub fn default_version_table() -> Vec<VersionEntry> {
    vec![
        VersionEntry::new(
            "5.1.6",
            "/usr/local/ffmpeg-versions/5.1.6/ffmpeg",
            Some("ffmpeg:5.1.6"),
        ),
        VersionEntry::new(
            "7.1.0",
            "/usr/local/ffmpeg-versions/7.1.0/ffmpeg",
            Some("ffmpeg:7.1.0"),
        ),
        VersionEntry::new(
            "8.0.0",
            "/usr/local/ffmpeg-versions/8.0.0/ffmpeg",
            Some("ffmpeg:8.0.0"),
        ),
        VersionEntry::new("system", "ffmpeg", None),
        VersionEntry::new("homebrew", "/opt/homebrew/bin/ffmpeg", None),
    ]
}

/// Where a resolved ffmpeg runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ToolLocation {
    /// A native executable.
    Native { path: PathBuf },
    /// A container image run through the docker CLI.
    Isolated { docker: PathBuf, image: String },
}

impl ToolLocation {
    /// Identifier recorded in reports.
    pub fn identifier(&self) -> String {
        match self {
            Self::Native { path } => path.display().to_string(),
            Self::Isolated { image, .. } => format!("docker:{image}"),
        }
    }

    /// Build the invocation for `args`.
    ///
    /// For isolated execution the parent directory of the resolved `source`
    /// is bind-mounted at [`CONTAINER_MOUNT`] and any argument equal to
    /// `source` is rewritten to the in-container path.
    pub fn command<S: AsRef<OsStr>>(&self, args: &[S], source: Option<&Path>) -> ToolCommand {
        match self {
            Self::Native { path } => {
                let mut cmd = ToolCommand::new(path);
                cmd.args(args);
                cmd
            }
            Self::Isolated { docker, image } => {
                let mut cmd = ToolCommand::new(docker);
                cmd.args(["run", "--rm"]);
                let mut rewritten: Vec<OsString> =
                    args.iter().map(|a| a.as_ref().to_owned()).collect();
                if let Some(source) = source {
                    let resolved = source
                        .canonicalize()
                        .unwrap_or_else(|_| source.to_path_buf());
                    if let (Some(parent), Some(name)) = (resolved.parent(), resolved.file_name()) {
                        let mut volume = parent.as_os_str().to_owned();
                        volume.push(":");
                        volume.push(CONTAINER_MOUNT);
                        cmd.arg("-v").arg(volume);
                        let mounted = Path::new(CONTAINER_MOUNT).join(name).into_os_string();
                        for arg in rewritten.iter_mut() {
                            if arg.as_os_str() == source.as_os_str() {
                                *arg = mounted.clone();
                            }
                        }
                    }
                }
                cmd.arg(image).args(rewritten);
                cmd
            }
        }
    }
}

/// Details reported by `ffmpeg -version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    /// Version token from the banner line.
    pub version: Option<String>,
    /// Compiler/build line.
    pub build: Option<String>,
    /// `configuration:` line.
    pub configuration: Option<String>,
}

impl VersionInfo {
    /// Parse `-version` stdout.
    pub fn parse(stdout: &str) -> Self {
        static BANNER: once_cell::sync::Lazy<Regex> =
            once_cell::sync::Lazy::new(|| Regex::new(r"ffmpeg version (\S+)").unwrap());

        let mut lines = stdout.lines();
        let version = lines
            .next()
            .and_then(|line| BANNER.captures(line))
            .map(|caps| caps[1].to_string());

        let mut info = Self {
            version,
            ..Self::default()
        };
        for line in stdout.lines().skip(1) {
            let line = line.trim();
            if info.build.is_none()
                && (line.starts_with("built with") || line.starts_with("built on"))
            {
                info.build = Some(line.to_string());
            } else if info.configuration.is_none() && line.starts_with("configuration:") {
                info.configuration = Some(line.to_string());
            }
        }
        info
    }
}

/// A version that passed resolution and the version-query check.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTool {
    /// Table identifier.
    pub id: String,
    /// Where the tool runs.
    pub location: ToolLocation,
    /// Version string the tool reported.
    pub version: Option<String>,
}

/// Availability report for one table entry.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Table identifier.
    pub id: String,
    /// Whether the entry resolves to a runnable tool.
    pub available: bool,
    /// Resolved location identifier.
    pub location: Option<String>,
    /// Version string if the version query succeeded.
    pub version: Option<String>,
}

/// Resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub table: Vec<VersionEntry>,
    pub default_version: String,
    pub preferred_version: Option<String>,
    pub priority: Vec<String>,
    pub use_isolation: bool,
    pub docker_program: PathBuf,
    pub docker_timeout: Duration,
    pub version_timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            table: default_version_table(),
            default_version: DEFAULT_VERSION.to_string(),
            preferred_version: None,
            priority: VERSION_PRIORITY.iter().map(|s| s.to_string()).collect(),
            use_isolation: true,
            docker_program: PathBuf::from("docker"),
            docker_timeout: Duration::from_secs(5),
            version_timeout: Duration::from_secs(10),
        }
    }
}

/// Maps version identifiers to runnable ffmpeg locations.
///
/// The table is never modified. Fallback locations found under a `bin/`
/// subdirectory go into a per-resolver override map, and every lookup is
/// cached for the resolver's lifetime.
#[derive(Debug)]
pub struct VersionResolver {
    settings: ResolverSettings,
    overrides: Mutex<HashMap<String, PathBuf>>,
    availability: Mutex<HashMap<String, Option<ToolLocation>>>,
    versions: Mutex<HashMap<String, VersionInfo>>,
    images: Mutex<HashMap<String, bool>>,
    isolation: OnceCell<bool>,
}

impl Default for VersionResolver {
    fn default() -> Self {
        Self::new(ResolverSettings::default())
    }
}

impl VersionResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        Self {
            settings,
            overrides: Mutex::new(HashMap::new()),
            availability: Mutex::new(HashMap::new()),
            versions: Mutex::new(HashMap::new()),
            images: Mutex::new(HashMap::new()),
            isolation: OnceCell::new(),
        }
    }

    /// Table entries in table order.
    pub fn entries(&self) -> &[VersionEntry] {
        &self.settings.table
    }

    fn entry(&self, id: &str) -> Option<&VersionEntry> {
        self.settings.table.iter().find(|e| e.id == id)
    }

    /// Fallback path discovered for `id`, if any.
    pub fn override_path(&self, id: &str) -> Option<PathBuf> {
        self.overrides.lock().get(id).cloned()
    }

    /// Whether the docker daemon answers within the docker timeout.
    pub fn isolation_available(&self) -> bool {
        *self.isolation.get_or_init(|| {
            if !self.settings.use_isolation {
                return false;
            }
            let ok = ToolCommand::new(&self.settings.docker_program)
                .arg("info")
                .discard_stdout()
                .timeout(self.settings.docker_timeout)
                .execute()
                .map(|out| out.success)
                .unwrap_or(false);
            tracing::debug!(available = ok, "checked docker availability");
            ok
        })
    }

    fn image_present(&self, image: &str) -> bool {
        if let Some(present) = self.images.lock().get(image) {
            return *present;
        }
        let present = ToolCommand::new(&self.settings.docker_program)
            .args(["image", "inspect", image])
            .discard_stdout()
            .timeout(self.settings.docker_timeout)
            .execute()
            .map(|out| out.success)
            .unwrap_or(false);
        self.images.lock().insert(image.to_string(), present);
        present
    }

    /// Locate `id`, preferring its container image over native paths.
    pub fn locate(&self, id: &str) -> Option<ToolLocation> {
        if let Some(cached) = self.availability.lock().get(id) {
            return cached.clone();
        }
        let location = self.entry(id).and_then(|entry| self.probe_entry(entry));
        tracing::debug!(version = id, location = ?location, "resolved ffmpeg location");
        self.availability
            .lock()
            .insert(id.to_string(), location.clone());
        location
    }

    fn probe_entry(&self, entry: &VersionEntry) -> Option<ToolLocation> {
        if let Some(image) = &entry.image {
            if self.isolation_available() && self.image_present(image) {
                return Some(ToolLocation::Isolated {
                    docker: self.settings.docker_program.clone(),
                    image: image.clone(),
                });
            }
        }

        if let Some(path) = self.override_path(&entry.id) {
            if is_executable(&path) {
                return Some(ToolLocation::Native { path });
            }
        }

        if entry.is_path_lookup() {
            return which::which(&entry.path)
                .ok()
                .map(|path| ToolLocation::Native { path });
        }

        if is_executable(&entry.path) {
            return Some(ToolLocation::Native {
                path: entry.path.clone(),
            });
        }

        let fallback = entry
            .path
            .parent()
            .map(|dir| dir.join("bin").join(entry.path.file_name().unwrap_or_default()))?;
        if is_executable(&fallback) {
            self.overrides
                .lock()
                .insert(entry.id.clone(), fallback.clone());
            return Some(ToolLocation::Native { path: fallback });
        }

        None
    }

    /// Whether `id` resolves to a runnable location.
    pub fn is_available(&self, id: &str) -> bool {
        self.locate(id).is_some()
    }

    /// Available identifiers in table order.
    pub fn available_versions(&self) -> Vec<String> {
        self.settings
            .table
            .iter()
            .filter(|e| self.is_available(&e.id))
            .map(|e| e.id.clone())
            .collect()
    }

    /// Pick the version to use when none is requested.
    ///
    /// Order: the configured default, the preferred version, the priority
    /// list, then the first available entry in table order.
    pub fn best_available(&self) -> Result<String> {
        let default = std::iter::once(self.settings.default_version.as_str());
        let preferred = self.settings.preferred_version.as_deref().into_iter();
        let priority = self.settings.priority.iter().map(String::as_str);
        let table = self.settings.table.iter().map(|e| e.id.as_str());

        default
            .chain(preferred)
            .chain(priority)
            .chain(table)
            .find(|id| self.is_available(id))
            .map(str::to_string)
            .ok_or(Error::NoToolAvailable)
    }

    /// Version details for `id`, cached after the first successful query.
    pub fn version_info(&self, id: &str) -> Result<VersionInfo> {
        if let Some(info) = self.versions.lock().get(id) {
            return Ok(info.clone());
        }
        let location = self.locate(id).ok_or_else(|| Error::unavailable(id))?;
        let output = location
            .command(&["-version"], None)
            .timeout(self.settings.version_timeout)
            .execute()?;
        if !output.success {
            return Err(Error::tool_failed(
                TOOL,
                format!(
                    "version query for {id} exited with {:?}: {}",
                    output.code,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        let info = VersionInfo::parse(&String::from_utf8_lossy(&output.stdout));
        if info.version.is_none() {
            return Err(Error::parse_error(TOOL, format!("no version banner for {id}")));
        }
        self.versions.lock().insert(id.to_string(), info.clone());
        Ok(info)
    }

    /// Resolve `requested`, or the best available version, and validate it.
    ///
    /// # Errors
    ///
    /// [`Error::VersionUnavailable`] for unknown or missing versions,
    /// [`Error::NoToolAvailable`] when nothing is installed, or the version
    /// query's failure.
    pub fn resolve(&self, requested: Option<&str>) -> Result<ResolvedTool> {
        let id = match requested {
            Some(id) => id.to_string(),
            None => self.best_available()?,
        };
        let location = self.locate(&id).ok_or_else(|| Error::unavailable(&id))?;
        let info = self.version_info(&id)?;
        tracing::info!(
            version = %id,
            reported = info.version.as_deref().unwrap_or("unknown"),
            location = %location.identifier(),
            "using ffmpeg"
        );
        Ok(ResolvedTool {
            id,
            location,
            version: info.version,
        })
    }

    /// Availability report for every table entry.
    pub fn status(&self) -> Vec<ToolInfo> {
        self.settings
            .table
            .iter()
            .map(|entry| {
                let location = self.locate(&entry.id);
                let version = location
                    .as_ref()
                    .and_then(|_| self.version_info(&entry.id).ok())
                    .and_then(|info| info.version);
                ToolInfo {
                    id: entry.id.clone(),
                    available: location.is_some(),
                    location: location.map(|l| l.identifier()),
                    version,
                }
            })
            .collect()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const VERSION_OUTPUT: &str = "ffmpeg version 7.1.0 Copyright (c) 2000-2024 the FFmpeg developers\n\
        built with Apple clang version 15.0.0 (clang-1500.3.9.4)\n\
        configuration: --prefix=/opt/homebrew --enable-gpl\n\
        libavutil      59. 39.100 / 59. 39.100\n";

    fn settings(table: Vec<VersionEntry>) -> ResolverSettings {
        ResolverSettings {
            table,
            use_isolation: false,
            docker_program: PathBuf::from("nonexistent_docker_12345"),
            ..ResolverSettings::default()
        }
    }

    #[cfg(unix)]
    fn fake_ffmpeg(path: &Path, version: &str) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let script = format!(
            "#!/bin/sh\necho \"ffmpeg version {version} Copyright (c) the FFmpeg developers\"\necho \"configuration: --enable-gpl\"\n"
        );
        std::fs::write(path, script).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_version_info_parse() {
        let info = VersionInfo::parse(VERSION_OUTPUT);
        assert_eq!(info.version.as_deref(), Some("7.1.0"));
        assert!(info.build.unwrap().starts_with("built with Apple clang"));
        assert_eq!(
            info.configuration.as_deref(),
            Some("configuration: --prefix=/opt/homebrew --enable-gpl")
        );
        assert_eq!(VersionInfo::parse("not ffmpeg"), VersionInfo::default());
    }

    #[test]
    fn test_default_table_shape() {
        let table = default_version_table();
        assert!(table.iter().any(|e| e.image.is_some()));
        assert!(table.iter().any(|e| e.is_path_lookup()));
        assert!(table.iter().any(|e| e.id == DEFAULT_VERSION));
    }

    #[test]
    fn test_isolated_command_rewrites_source() {
        let location = ToolLocation::Isolated {
            docker: PathBuf::from("docker"),
            image: "ffmpeg:5.1.6".to_string(),
        };
        let source = Path::new("/music/album/track 01.flac");
        let args = ["-i", "/music/album/track 01.flac", "-f", "null", "-"];
        let cmd = location.command(&args, Some(source));
        assert_eq!(cmd.program(), Path::new("docker"));
        assert_eq!(
            cmd.arguments(),
            [
                "run",
                "--rm",
                "-v",
                "/music/album:/audio",
                "ffmpeg:5.1.6",
                "-i",
                "/audio/track 01.flac",
                "-f",
                "null",
                "-"
            ]
        );
        assert_eq!(location.identifier(), "docker:ffmpeg:5.1.6");
    }

    #[test]
    fn test_native_command_passes_args_through() {
        let location = ToolLocation::Native {
            path: PathBuf::from("/usr/bin/ffmpeg"),
        };
        let args = vec!["-i".to_string(), "/a/b.mp3".to_string()];
        let cmd = location.command(&args, Some(Path::new("/a/b.mp3")));
        assert_eq!(cmd.arguments(), ["-i", "/a/b.mp3"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_isolated_command_keeps_raw_file_name() {
        use std::os::unix::ffi::OsStrExt;

        let location = ToolLocation::Isolated {
            docker: PathBuf::from("docker"),
            image: "ffmpeg:5.1.6".to_string(),
        };
        let source = Path::new(OsStr::from_bytes(b"/music/old/caf\xe9.mp3"));
        let args = [OsStr::new("-i"), source.as_os_str()];
        let cmd = location.command(&args, Some(source));
        let rewritten = cmd.arguments().last().unwrap();
        assert_eq!(rewritten.as_bytes(), b"/audio/caf\xe9.mp3");
        assert!(cmd.arguments().iter().any(|a| a == "/music/old:/audio"));
    }

    #[test]
    fn test_nothing_available() {
        let resolver = VersionResolver::new(settings(vec![VersionEntry::new(
            "5.1.6",
            "/nonexistent/ffmpeg-versions/5.1.6/ffmpeg",
            Some("ffmpeg:5.1.6"),
        )]));
        assert!(!resolver.isolation_available());
        assert!(resolver.available_versions().is_empty());
        assert_matches!(resolver.best_available(), Err(Error::NoToolAvailable));
        assert_matches!(
            resolver.resolve(None),
            Err(Error::NoToolAvailable)
        );
    }

    #[test]
    fn test_unknown_version_is_unavailable() {
        let resolver = VersionResolver::new(settings(vec![]));
        assert_matches!(
            resolver.resolve(Some("9.9.9")),
            Err(Error::VersionUnavailable { version }) if version == "9.9.9"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_best_available_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = |id: &str| dir.path().join(id).join("ffmpeg");
        fake_ffmpeg(&path("7.1.0"), "7.1.0");
        fake_ffmpeg(&path("custom"), "6.0");

        let table = vec![
            VersionEntry::new("5.1.6", path("5.1.6"), None),
            VersionEntry::new("custom", path("custom"), None),
            VersionEntry::new("7.1.0", path("7.1.0"), None),
        ];

        // Default missing: priority list walks 8.0.0, 7.1.0.
        let resolver = VersionResolver::new(settings(table.clone()));
        assert_eq!(resolver.best_available().unwrap(), "7.1.0");

        // Preferred beats the priority list.
        let mut s = settings(table.clone());
        s.preferred_version = Some("custom".to_string());
        assert_eq!(VersionResolver::new(s).best_available().unwrap(), "custom");

        // Default beats everything once installed.
        fake_ffmpeg(&path("5.1.6"), "5.1.6");
        let resolver = VersionResolver::new(settings(table.clone()));
        assert_eq!(resolver.best_available().unwrap(), "5.1.6");

        // Nothing on the priority list: first available in table order.
        let mut s = settings(table);
        s.default_version = "none".to_string();
        s.priority = vec![];
        assert_eq!(VersionResolver::new(s).best_available().unwrap(), "5.1.6");
    }

    #[cfg(unix)]
    #[test]
    fn test_bin_fallback_goes_to_override_map() {
        let dir = tempfile::tempdir().unwrap();
        let declared = dir.path().join("8.0.0").join("ffmpeg");
        fake_ffmpeg(&dir.path().join("8.0.0").join("bin").join("ffmpeg"), "8.0");

        let resolver =
            VersionResolver::new(settings(vec![VersionEntry::new("8.0.0", &declared, None)]));
        let location = resolver.locate("8.0.0").unwrap();
        let expected = dir.path().join("8.0.0").join("bin").join("ffmpeg");
        assert_eq!(location, ToolLocation::Native { path: expected.clone() });
        assert_eq!(resolver.override_path("8.0.0"), Some(expected));
        assert_eq!(resolver.entries()[0].path, declared);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffmpeg");
        std::fs::write(&path, "not a program").unwrap();
        let resolver = VersionResolver::new(settings(vec![VersionEntry::new("x", &path, None)]));
        assert!(!resolver.is_available("x"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_validates_version_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffmpeg");
        fake_ffmpeg(&path, "5.1.6");

        let resolver =
            VersionResolver::new(settings(vec![VersionEntry::new("5.1.6", &path, None)]));
        let tool = resolver.resolve(None).unwrap();
        assert_eq!(tool.id, "5.1.6");
        assert_eq!(tool.version.as_deref(), Some("5.1.6"));
        assert_eq!(tool.location, ToolLocation::Native { path: path.clone() });

        // Cached: removing the binary does not change the answer.
        std::fs::remove_file(&path).unwrap();
        assert!(resolver.is_available("5.1.6"));
        assert_eq!(
            resolver.version_info("5.1.6").unwrap().version.as_deref(),
            Some("5.1.6")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_status_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffmpeg");
        fake_ffmpeg(&path, "7.1.0");

        let resolver = VersionResolver::new(settings(vec![
            VersionEntry::new("7.1.0", &path, None),
            VersionEntry::new("8.0.0", dir.path().join("missing"), None),
        ]));
        let status = resolver.status();
        assert_eq!(status.len(), 2);
        assert!(status[0].available);
        assert_eq!(status[0].version.as_deref(), Some("7.1.0"));
        assert!(!status[1].available);
        assert!(status[1].location.is_none());
    }
}
