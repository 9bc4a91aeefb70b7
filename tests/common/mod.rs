//! Shared test harness for integration tests.
//!
//! Provides [`MockEngine`], which writes shell scripts standing in for ffmpeg
//! into a temporary directory and builds supervisors, probes and full
//! [`AppContext`]s around them.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hlsrelay::config::Config;
use hlsrelay::server::AppContext;
use hlsrelay::supervisor::Supervisor;
use hlsrelay_av::{ConnectivityProbe, EngineCommand, OutputSink};
use tempfile::TempDir;

/// Engine that never writes output and waits to be terminated.
pub const SILENT: &str = "exec sleep 30";

/// Engine that fails the way ffmpeg does against a closed port.
pub const REFUSED: &str =
    "echo 'rtsp://example/test: Connection refused' >&2\nexit 1";

/// Engine that ignores the graceful termination signal.
pub const STUBBORN: &str = "trap '' TERM\nwhile :; do sleep 0.1; done";

/// Temporary workspace holding mock engine scripts and the output directory.
pub struct MockEngine {
    pub dir: TempDir,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// Write `body` as a shell script and return a command running it.
    ///
    /// Scripts run through `/bin/sh` rather than being executed directly, so
    /// a freshly written file is never exec'd while another thread holds it
    /// open for writing.
    pub fn command(&self, body: &str) -> EngineCommand {
        let path = self.dir.path().join(format!("engine-{}.sh", next_script_id()));
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
        let mut cmd = EngineCommand::new("/bin/sh");
        cmd.arg(path.to_string_lossy().to_string());
        cmd
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("hls")
    }

    /// File the pid-recording scripts append to.
    pub fn pid_file(&self) -> PathBuf {
        self.dir.path().join("pids")
    }

    /// Script that records its pid, then behaves like [`SILENT`].
    pub fn recording_silent(&self) -> String {
        format!("echo $$ >> '{}'\nexec sleep 30", self.pid_file().display())
    }

    pub fn recorded_pids(&self) -> Vec<i32> {
        std::fs::read_to_string(self.pid_file())
            .unwrap_or_default()
            .lines()
            .filter_map(|l| l.trim().parse().ok())
            .collect()
    }

    /// Config with the output directory inside the workspace and short
    /// timeouts.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.output.dir = self.output_dir();
        config.engine.grace_period_ms = 500;
        config.engine.kill_timeout_ms = 2000;
        config.probe.timeout_ms = 300;
        config
    }

    pub fn sink(&self) -> OutputSink {
        OutputSink::new(&self.config().output)
    }

    pub fn supervisor(&self, body: &str) -> Supervisor {
        self.supervisor_with(self.command(body))
    }

    pub fn supervisor_with(&self, base: EngineCommand) -> Supervisor {
        Supervisor::new(base, self.sink(), &self.config().engine)
    }

    pub fn probe(&self, body: &str) -> ConnectivityProbe {
        ConnectivityProbe::new(self.command(body), self.config().probe)
    }

    /// Full application context with separate session and probe engines.
    pub fn context(&self, session_body: &str, probe_body: &str) -> AppContext {
        AppContext {
            config: Arc::new(self.config()),
            supervisor: self.supervisor(session_body),
            probe: Arc::new(self.probe(probe_body)),
        }
    }

    /// Write a minimal playlist as the engine would.
    pub fn write_playlist(&self) {
        std::fs::create_dir_all(self.output_dir()).unwrap();
        std::fs::write(
            self.output_dir().join("stream.m3u8"),
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:2\n",
        )
        .unwrap();
    }
}

fn next_script_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed).to_string()
}

/// Poll `cond` every 20 ms until it holds or `timeout` passes.
pub async fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Whether a process with this pid exists.
#[cfg(unix)]
pub fn pid_alive(pid: i32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}
