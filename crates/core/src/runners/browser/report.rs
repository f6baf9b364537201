//! JSON bodies posted by the harness page

use serde::{Deserialize, Serialize};

use crate::types::{CrashReason, RawOutcome};

/// Terminal report posted to `/report`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HarnessReport {
    UncaughtException {
        #[serde(rename = "uncaughtException")]
        message: String,
    },
    Completed {
        total: u32,
        failed: u32,
    },
}

impl HarnessReport {
    /// Counts are coherent: no more failures than tests
    pub fn is_consistent(&self) -> bool {
        match self {
            HarnessReport::Completed { total, failed } => failed <= total,
            HarnessReport::UncaughtException { .. } => true,
        }
    }

    pub fn into_outcome(self) -> RawOutcome {
        match self {
            HarnessReport::Completed { total, failed } => RawOutcome::Reported { total, failed },
            HarnessReport::UncaughtException { message } => {
                RawOutcome::Crashed(CrashReason::UncaughtException(message))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Console line forwarded to `/output`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}
