//! Builder for executing external tool commands with optional timeout support.

use crate::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often a bounded command is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Output captured from a tool execution.
///
/// A non-zero exit is not an error at this level; callers decide what the
/// exit status means next to the captured bytes.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, absent when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output (empty when stdout was discarded).
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// First line of stdout, lossily decoded.
    pub fn first_stdout_line(&self) -> Option<String> {
        String::from_utf8_lossy(&self.stdout)
            .lines()
            .next()
            .map(|s| s.trim().to_string())
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// Probe invocations run unbounded; auxiliary checks (version queries,
/// container availability) set a timeout.
///
/// # Example
///
/// ```no_run
/// use audioprobe_av::ToolCommand;
/// use std::time::Duration;
///
/// let output = ToolCommand::new("ffmpeg")
///     .arg("-version")
///     .timeout(Duration::from_secs(10))
///     .execute()?;
/// println!("{:?}", output.first_stdout_line());
/// # Ok::<(), audioprobe_av::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Option<Duration>,
    capture_stdout: bool,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            capture_stdout: true,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(s.as_ref().to_owned());
        self
    }

    /// Append multiple arguments. Paths pass through without re-encoding.
    pub fn args<I, S>(&mut self, iter: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(iter.into_iter().map(|s| s.as_ref().to_owned()));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = Some(d);
        self
    }

    /// Send stdout to the null device instead of capturing it.
    pub fn discard_stdout(&mut self) -> &mut Self {
        self.capture_stdout = false;
        self
    }

    /// The program this command launches.
    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    /// Arguments in invocation order.
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stderr and (unless discarded) stdout.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if the program does not exist.
    /// - [`Error::ToolFailed`] if spawning or reading the process fails.
    /// - [`Error::Timeout`] if a timeout is set and expires; the child is killed.
    pub fn execute(&self) -> Result<ToolOutput> {
        let tool = self.tool_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .stdout(if self.capture_stdout {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found(&tool)
            } else {
                Error::tool_failed(&tool, format!("failed to spawn: {e}"))
            }
        })?;

        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let status = match self.timeout {
            None => child.wait()?,
            Some(limit) => {
                let start = Instant::now();
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if start.elapsed() > limit {
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = collect(stdout_reader, &tool);
                        let _ = collect(stderr_reader, &tool);
                        return Err(Error::Timeout { tool, limit });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        };

        Ok(ToolOutput {
            success: status.success(),
            code: status.code(),
            stdout: collect(stdout_reader, &tool)?,
            stderr: collect(stderr_reader, &tool)?,
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        source.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(reader: Option<JoinHandle<std::io::Result<Vec<u8>>>>, tool: &str) -> Result<Vec<u8>> {
    match reader {
        None => Ok(Vec::new()),
        Some(handle) => handle
            .join()
            .map_err(|_| Error::tool_failed(tool, "output reader thread panicked"))?
            .map_err(Error::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn execute_nonexistent_tool() {
        let result = ToolCommand::new("nonexistent_tool_xyz_12345").execute();
        assert_matches!(result, Err(Error::ToolNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn execute_echo() {
        let output = ToolCommand::new("echo").arg("hello").execute().unwrap();
        assert!(output.success);
        assert_eq!(output.first_stdout_line().as_deref(), Some("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_still_captures_stderr() {
        let output = ToolCommand::new("sh")
            .args(["-c", "echo oops >&2; exit 3"])
            .execute()
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.code, Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "oops");
    }

    #[cfg(unix)]
    #[test]
    fn discarded_stdout_is_empty() {
        let output = ToolCommand::new("echo")
            .arg("hello")
            .discard_stdout()
            .execute()
            .unwrap();
        assert!(output.stdout.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_arguments_reach_the_process() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let name = OsStr::from_bytes(b"caf\xe9.mp3");
        let file = dir.path().join(name);
        std::fs::write(&file, b"audio").unwrap();

        let output = ToolCommand::new("ls").arg(&file).execute().unwrap();
        assert!(output.success, "{}", String::from_utf8_lossy(&output.stderr));
        assert!(output
            .stdout
            .windows(name.len())
            .any(|w| w == name.as_bytes()));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_fires() {
        let result = ToolCommand::new("sleep")
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute();
        let err = result.unwrap_err();
        assert_matches!(err, Error::Timeout { .. });
        assert!(err.to_string().contains("timed out"), "unexpected error: {err}");
    }
}
