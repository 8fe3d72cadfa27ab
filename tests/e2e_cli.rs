//! CLI end-to-end tests
//!
//! Probing commands run against a stand-in ffmpeg shell script configured
//! through a temporary config file.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Get a command for the audioprobe binary
#[allow(deprecated)]
fn audioprobe_cmd() -> Command {
    let mut cmd = Command::cargo_bin("audioprobe").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("AUDIO_SERVICE_URL")
        .env_remove("AUDIO_SERVICE_API_KEY");
    cmd
}

#[cfg(unix)]
const FAKE_FFMPEG: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 7.1 Copyright (c) 2000-2024 the FFmpeg developers"
  echo "configuration: --enable-gpl"
  exit 0
fi
status=0
for arg in "$@"; do
  case "$arg" in
    *broken*) echo "$arg: Input/output error" >&2; exit 1 ;;
    *damaged*) status=1 ;;
  esac
done
cat >&2 <<'EOF'
Input #0, mp3, from 'track.mp3':
  Duration: 00:03:21.52, start: 0.025057, bitrate: 130 kb/s
  Stream #0:0: Audio: mp3, 44100 Hz, stereo, fltp, 128 kb/s
size=N/A time=00:03:21.50 bitrate=N/A speed= 812x
EOF
if [ "$status" -ne 0 ]; then
  echo "[mp3float @ 0x1] Header missing" >&2
fi
exit $status
"#;

/// A workspace with a stand-in ffmpeg and a config that only knows about it.
#[cfg(unix)]
struct Fixture {
    dir: TempDir,
    config: PathBuf,
}

#[cfg(unix)]
impl Fixture {
    fn new() -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let ffmpeg = dir.path().join("tools/fake/ffmpeg");
        fs::create_dir_all(ffmpeg.parent().unwrap()).unwrap();
        fs::write(&ffmpeg, FAKE_FFMPEG).unwrap();
        fs::set_permissions(&ffmpeg, fs::Permissions::from_mode(0o755)).unwrap();

        let config = dir.path().join("audioprobe.toml");
        fs::write(
            &config,
            format!(
                r#"
[tools]
default_version = "fake"
priority = []
use_docker = false

[[tools.versions]]
id = "fake"
path = "{}"

[[tools.versions]]
id = "missing"
path = "{}"

[batch]
report_dir = "{}"
"#,
                ffmpeg.display(),
                dir.path().join("tools/missing/ffmpeg").display(),
                dir.path().join("reports").display(),
            ),
        )
        .unwrap();

        Self { dir, config }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn touch(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"audio").unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = audioprobe_cmd();
        cmd.arg("--config").arg(&self.config);
        cmd
    }
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = audioprobe_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = audioprobe_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("audioprobe"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = audioprobe_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "audioprobe {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_subcommand_help() {
    for (args, text) in [
        (vec!["probe", "--help"], "Probe a single audio file"),
        (vec!["batch", "--help"], "--split-folders"),
        (vec!["compare", "--help"], "--versions"),
        (vec!["service", "--help"], "strip-playlist"),
    ] {
        audioprobe_cmd()
            .args(&args)
            .assert()
            .success()
            .stdout(predicate::str::contains(text));
    }
}

#[test]
fn test_cli_validate_defaults() {
    let dir = tempdir().unwrap();
    let mut cmd = audioprobe_cmd();
    cmd.current_dir(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Default ffmpeg: 5.1.6"));
}

#[test]
fn test_cli_validate_rejects_bad_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[batch]\njobs = 0\n").unwrap();

    audioprobe_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("jobs"));
}

#[test]
fn test_cli_batch_missing_directory() {
    let dir = tempdir().unwrap();
    audioprobe_cmd()
        .current_dir(dir.path())
        .args(["batch", "/nonexistent/audioprobe/music"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_service_requires_url() {
    let dir = tempdir().unwrap();
    audioprobe_cmd()
        .current_dir(dir.path())
        .args(["service", "cohort", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No audio service URL"));
}

#[cfg(unix)]
#[test]
fn test_cli_probe_file() {
    let fx = Fixture::new();
    let track = fx.touch("music/track.mp3");

    fx.cmd()
        .arg("probe")
        .arg(&track)
        .assert()
        .success()
        .stdout(predicate::str::contains("Format: mp3"))
        .stdout(predicate::str::contains("Bitrate: 128 kb/s"))
        .stdout(predicate::str::contains("Channels: 2"))
        .stdout(predicate::str::contains("00:03:21 (201.50s)"))
        .stdout(predicate::str::contains("ffmpeg: fake (7.1)"));
}

#[cfg(unix)]
#[test]
fn test_cli_probe_json() {
    let fx = Fixture::new();
    let track = fx.touch("music/track.mp3");

    let output = fx.cmd().arg("probe").arg(&track).arg("--json").output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["strategy"], "default");
    assert_eq!(json["format_name"], "mp3");
    assert_eq!(json["bitrate"], 128);
    assert_eq!(json["duration"], 201.5);
    assert_eq!(json["ffmpeg_identifier"], "fake");
}

#[cfg(unix)]
#[test]
fn test_cli_probe_damaged_file_with_full_metadata() {
    let fx = Fixture::new();
    let track = fx.touch("music/damaged.mp3");

    let output = fx.cmd().arg("probe").arg(&track).arg("--json").output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["strategy"], "default");
    assert_eq!(json["bitrate"], 128);
    assert_eq!(json["warnings"][0], "[mp3float @ 0x1] Header missing");
}

#[cfg(unix)]
#[test]
fn test_cli_probe_failures() {
    let fx = Fixture::new();
    let broken = fx.touch("music/broken.mp3");

    fx.cmd()
        .arg("probe")
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to probe"));

    fx.cmd()
        .arg("probe")
        .arg(fx.path("music/absent.mp3"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    fx.cmd()
        .arg("probe")
        .arg(fx.touch("music/track.mp3"))
        .args(["--ffmpeg-version", "missing"])
        .assert()
        .failure();
}

#[cfg(unix)]
#[test]
fn test_cli_batch_writes_report() {
    let fx = Fixture::new();
    fx.touch("Jazz/a.mp3");
    fx.touch("Jazz/sub/broken.flac");
    fx.touch("Jazz/cover.jpg");

    fx.cmd()
        .arg("batch")
        .arg(fx.path("Jazz"))
        .args(["--jobs", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total files:      2"))
        .stdout(predicate::str::contains("Successful:       1"))
        .stdout(predicate::str::contains("Errors:           1"));

    let report = fx.path("reports/Jazz_ffmpeg_probe_report.csv");
    let content = fs::read_to_string(&report).unwrap();
    assert!(content.starts_with("file_path,status,"));
    assert!(content.contains("a.mp3,Success,128,2,201.50,mp3,audio/mp3"));
    assert!(content.contains("sub/broken.flac,Error"));
}

#[cfg(unix)]
#[test]
fn test_cli_batch_split_folders() {
    let fx = Fixture::new();
    fx.touch("Library/Rock/one.mp3");
    fx.touch("Library/Blues/two.mp3");
    fx.touch("Library/loose.mp3");
    let out = fx.path("split");

    fx.cmd()
        .arg("batch")
        .arg(fx.path("Library"))
        .arg("--split-folders")
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    for name in ["Rock", "Blues", "individual_files"] {
        assert!(
            out.join(format!("{}_ffmpeg_probe_report.csv", name)).exists(),
            "missing report for {}",
            name
        );
    }
}

#[cfg(unix)]
#[test]
fn test_cli_compare_and_check_tools() {
    let fx = Fixture::new();
    let track = fx.touch("music/track.mp3");

    fx.cmd()
        .arg("compare")
        .arg(&track)
        .args(["--versions", "fake,missing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ fake"))
        .stdout(predicate::str::contains("- missing"));

    fx.cmd()
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ fake (7.1)"))
        .stdout(predicate::str::contains("✗ missing"))
        .stdout(predicate::str::contains("Best available: fake"));
}
