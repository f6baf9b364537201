//! Runs test bundles as local processes (`wasmer` and `node` environments)

use async_trait::async_trait;
use regex::Regex;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    command::ToolCommand,
    config::RuntimeConfig,
    types::{CrashReason, Environment, RawOutcome, RunRequest, TestSummary},
};

use super::traits::Runner;

/// Number of trailing stderr lines kept for the outcome
pub const STDERR_TAIL_LINES: usize = 20;

/// How long output is still read after the test process exited. Descendants
/// of the process can hold its pipes open past that.
pub const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Loader used for `node` when the bundle has no JavaScript sibling
pub const NODE_WASI_LOADER: &str = r#"const { readFile } = require("node:fs/promises");
const { WASI } = require("node:wasi");
const { argv, env, exit } = require("node:process");

async function main() {
  const bundlePath = argv[2];
  const wasi = new WASI({
    version: "preview1",
    args: [bundlePath, ...argv.slice(3)],
    env,
    returnOnExit: true,
  });
  const bytes = await readFile(bundlePath);
  const { instance } = await WebAssembly.instantiate(bytes, {
    wasi_snapshot_preview1: wasi.wasiImport,
  });
  exit(wasi.start(instance) ?? 0);
}

main().catch((error) => {
  console.error(error);
  exit(1);
});
"#;

static SUMMARY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Executed (\d+) tests?, with (\d+) failures?").expect("summary pattern is valid")
});

/// Parse an XCTest-style `Executed N tests, with M failures` line
pub fn parse_summary_line(line: &str) -> Option<TestSummary> {
    let captures = SUMMARY_PATTERN.captures(line)?;
    Some(TestSummary {
        total: captures[1].parse().ok()?,
        failed: captures[2].parse().ok()?,
    })
}

/// Runner that spawns the bundle under a command-line WASM host
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    wasmer: String,
    wasmer_args: Vec<String>,
    node: String,
    node_args: Vec<String>,
    output_grace: Duration,
}

impl ProcessRunner {
    pub fn from_config(runtimes: &RuntimeConfig) -> Self {
        Self {
            wasmer: runtimes.wasmer().to_string(),
            wasmer_args: runtimes.wasmer_args(),
            node: runtimes.node().to_string(),
            node_args: runtimes.node_args(),
            output_grace: OUTPUT_DRAIN_GRACE,
        }
    }

    pub fn with_output_grace(mut self, grace: Duration) -> Self {
        self.output_grace = grace;
        self
    }

    /// Command that runs `bundle` under `environment`'s host. For `node`,
    /// `loader` is the JavaScript entry point.
    pub fn command_for(
        &self,
        bundle: &Path,
        environment: Environment,
        loader: Option<&Path>,
    ) -> Option<ToolCommand> {
        match environment {
            Environment::Wasmer => Some(
                ToolCommand::new(&self.wasmer)
                    .args(self.wasmer_args.iter().cloned())
                    .arg(bundle.display().to_string()),
            ),
            Environment::Node => {
                let mut command = ToolCommand::new(&self.node).args(self.node_args.iter().cloned());
                if let Some(loader) = loader {
                    command = command.arg(loader.display().to_string());
                }
                Some(command.arg(bundle.display().to_string()))
            }
            Environment::DefaultBrowser => None,
        }
    }

    async fn run(&self, request: &RunRequest, cancel: CancellationToken) -> RawOutcome {
        // The temporary loader directory lives until the process is reaped
        let (loader, _loader_dir) = match request.environment {
            Environment::Node => match node_loader(&request.bundle) {
                Ok(found) => found,
                Err(e) => {
                    return RawOutcome::Crashed(CrashReason::Internal(format!(
                        "failed to write node loader: {e}"
                    )));
                }
            },
            _ => (None, None),
        };

        let Some(command) =
            self.command_for(&request.bundle, request.environment, loader.as_deref())
        else {
            return RawOutcome::Crashed(CrashReason::Internal(format!(
                "{} bundles cannot run as a process",
                request.environment
            )));
        };

        let shell_cmd = command.to_shell_command();
        info!("Running: {}", shell_cmd);

        let mut child = match command.to_tokio_command().spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return RawOutcome::Crashed(CrashReason::RunnerUnavailable(format!(
                    "`{}` not found",
                    command.program
                )));
            }
            Err(e) => {
                return RawOutcome::Crashed(CrashReason::RunnerUnavailable(format!(
                    "failed to spawn `{}`: {e}",
                    command.program
                )));
            }
        };

        let stop_reading = CancellationToken::new();
        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_stdout(out, stop_reading.clone())));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_stderr(err, stop_reading.clone())));
        // Readers end with the run on every path
        let _readers_guard = stop_reading.clone().drop_guard();

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let status = match status {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                let _ = child.kill().await;
                return RawOutcome::Crashed(CrashReason::Internal(format!(
                    "failed to wait for test process: {e}"
                )));
            }
            None => {
                debug!("Cancelled, killing test process");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill test process: {}", e);
                }
                return RawOutcome::Crashed(CrashReason::Cancelled);
            }
        };

        let readers = async {
            let summary = match stdout_task {
                Some(task) => task.await.unwrap_or_default(),
                None => None,
            };
            let stderr_tail = match stderr_task {
                Some(task) => task.await.map(Vec::from).unwrap_or_default(),
                None => Vec::new(),
            };
            stop_reading.cancel();
            (summary, stderr_tail)
        };
        let stopper = async {
            let interrupted = tokio::select! {
                _ = stop_reading.cancelled() => false,
                _ = cancel.cancelled() => true,
                _ = tokio::time::sleep(self.output_grace) => {
                    warn!(
                        "Test process output still open {}ms after exit, ignoring the rest",
                        self.output_grace.as_millis()
                    );
                    false
                }
            };
            stop_reading.cancel();
            interrupted
        };
        let ((summary, stderr_tail), interrupted) = tokio::join!(readers, stopper);

        if interrupted {
            debug!("Cancelled while reading test process output");
            return RawOutcome::Crashed(CrashReason::Cancelled);
        }

        match status.code() {
            Some(code) => {
                debug!("Test process exited with code {}", code);
                RawOutcome::Exited {
                    code,
                    stderr_tail,
                    summary,
                }
            }
            None => RawOutcome::Crashed(terminated_by_signal(status)),
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    async fn execute(&self, request: &RunRequest, cancel: CancellationToken) -> RawOutcome {
        self.run(request, cancel).await
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

/// Find the bundle's JavaScript sibling, or write the generic WASI loader
/// into a temporary directory
fn node_loader(bundle: &Path) -> std::io::Result<(Option<PathBuf>, Option<TempDir>)> {
    let sibling = bundle.with_extension("js");
    if sibling.is_file() {
        debug!("Using bundled loader {}", sibling.display());
        return Ok((Some(sibling), None));
    }

    let dir = tempfile::Builder::new().prefix("wasm-runner-node").tempdir()?;
    let loader = dir.path().join("loader.cjs");
    std::fs::write(&loader, NODE_WASI_LOADER)?;
    debug!("Generated node loader {}", loader.display());
    Ok((Some(loader), Some(dir)))
}

/// Next line of `lines`, or `None` at end of stream or once `stop` fires
async fn next_line<R: AsyncRead + Unpin>(
    lines: &mut Lines<BufReader<R>>,
    stop: &CancellationToken,
) -> Option<String> {
    tokio::select! {
        line = lines.next_line() => line.ok().flatten(),
        _ = stop.cancelled() => None,
    }
}

async fn forward_stdout(
    stream: impl AsyncRead + Unpin,
    stop: CancellationToken,
) -> Option<TestSummary> {
    let mut lines = BufReader::new(stream).lines();
    let mut summary = None;

    while let Some(line) = next_line(&mut lines, &stop).await {
        println!("{line}");
        // The last summary is the one covering all suites
        if let Some(found) = parse_summary_line(&line) {
            summary = Some(found);
        }
    }

    summary
}

async fn forward_stderr(
    stream: impl AsyncRead + Unpin,
    stop: CancellationToken,
) -> VecDeque<String> {
    let mut lines = BufReader::new(stream).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

    while let Some(line) = next_line(&mut lines, &stop).await {
        eprintln!("{line}");
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    tail
}

#[cfg(unix)]
fn terminated_by_signal(status: std::process::ExitStatus) -> CrashReason {
    use std::os::unix::process::ExitStatusExt;

    match status.signal() {
        Some(signal) => CrashReason::Signal(signal),
        None => CrashReason::Internal(format!("test process ended without exit code: {status}")),
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(status: std::process::ExitStatus) -> CrashReason {
    CrashReason::Internal(format!("test process ended without exit code: {status}"))
}
