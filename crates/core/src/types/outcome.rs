//! Runner outcomes and the final verdict

use std::fmt;

use serde::Serialize;

/// Exit code for a run whose tests all passed
pub const EXIT_PASSED: i32 = 0;
/// Exit code for a run that completed with failing tests
pub const EXIT_FAILED: i32 = 1;
/// Exit code for a run that never produced a test result
pub const EXIT_CRASHED: i32 = 2;

/// Test counts observed in a runner's output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TestSummary {
    pub total: u32,
    pub failed: u32,
}

/// Why a run ended without a test result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CrashReason {
    /// The runtime executable could not be spawned
    RunnerUnavailable(String),
    /// No WebDriver session could be opened
    DriverUnavailable(String),
    /// The page threw before reporting results
    UncaughtException(String),
    /// The browser session stopped answering
    PageUnresponsive(String),
    /// The process was terminated by a signal
    Signal(i32),
    /// No report arrived within the allowed time
    Timeout,
    /// The caller aborted the run
    Cancelled,
    Internal(String),
}

impl fmt::Display for CrashReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrashReason::RunnerUnavailable(detail) => write!(f, "runner unavailable: {detail}"),
            CrashReason::DriverUnavailable(detail) => write!(f, "{detail}"),
            CrashReason::UncaughtException(message) => {
                write!(f, "uncaught exception in browser: {message}")
            }
            CrashReason::PageUnresponsive(detail) => {
                write!(f, "browser page became unresponsive: {detail}")
            }
            CrashReason::Signal(signal) => write!(f, "test process terminated by signal {signal}"),
            CrashReason::Timeout => f.write_str("timeout waiting for browser report"),
            CrashReason::Cancelled => f.write_str("run cancelled"),
            CrashReason::Internal(detail) => write!(f, "internal error: {detail}"),
        }
    }
}

/// Raw signal produced by a runner, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutcome {
    /// A test process ran to exit
    Exited {
        code: i32,
        stderr_tail: Vec<String>,
        summary: Option<TestSummary>,
    },
    /// The browser harness reported its results
    Reported { total: u32, failed: u32 },
    /// No result was produced
    Crashed(CrashReason),
}

/// Final result of one orchestration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    /// Tests ran to completion and some failed. Counts are absent when the
    /// runner could not observe them.
    Failed {
        total: Option<u32>,
        failed: Option<u32>,
    },
    Crashed { reason: CrashReason },
}

impl Verdict {
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Passed => EXIT_PASSED,
            Verdict::Failed { .. } => EXIT_FAILED,
            Verdict::Crashed { .. } => EXIT_CRASHED,
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Passed => f.write_str("all tests passed"),
            Verdict::Failed {
                total: Some(total),
                failed: Some(failed),
            } => write!(f, "{failed} of {total} tests failed"),
            Verdict::Failed {
                failed: Some(failed),
                ..
            } => write!(f, "{failed} tests failed"),
            Verdict::Failed { .. } => f.write_str("tests failed"),
            Verdict::Crashed { reason } => write!(f, "test run crashed: {reason}"),
        }
    }
}
