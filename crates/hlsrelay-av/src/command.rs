//! Builder for engine invocations with timeout support.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a finished engine run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing engine invocations.
///
/// A base command (program plus any leading arguments) is cloned and extended
/// with per-run arguments by the supervisor and the probe.
///
/// # Example
///
/// ```no_run
/// use hlsrelay_av::EngineCommand;
/// use std::time::Duration;
///
/// # async fn example() -> hlsrelay_core::Result<()> {
/// let output = EngineCommand::new("ffmpeg")
///     .arg("-hide_banner")
///     .arg("-version")
///     .timeout(Duration::from_secs(5))
///     .run()
///     .await?;
/// if let Some(out) = output {
///     println!("{}", out.status);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EngineCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl EngineCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time used by [`EngineCommand::run`].
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Short program name for logs and error messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Build the process command.
    ///
    /// stdin and stdout are detached; stderr is piped because it is the
    /// engine's only diagnostic channel. The child is killed if its handle is
    /// dropped, so an abandoned run can never outlive its owner.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run to completion, capturing stderr.
    ///
    /// Returns `Ok(None)` when the timeout expires; the child is killed when
    /// the pending wait is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`hlsrelay_core::Error::LaunchFailed`] if the process cannot be
    /// spawned, or [`hlsrelay_core::Error::Tool`] if waiting on it fails.
    pub async fn run(&self) -> hlsrelay_core::Result<Option<ToolOutput>> {
        let program_name = self.program_name();

        let child = self.to_command().spawn().map_err(|e| {
            hlsrelay_core::Error::launch_failed(&program_name, format!("failed to spawn: {e}"))
        })?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(Some(ToolOutput {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })),
            Ok(Err(e)) => Err(hlsrelay_core::Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => {
                tracing::debug!(
                    tool = %program_name,
                    timeout = ?self.timeout,
                    "Engine run timed out; child killed on drop"
                );
                Ok(None)
            }
        }
    }
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
