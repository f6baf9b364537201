//! Converts runner-specific outcomes into a single verdict

use crate::types::{RawOutcome, Verdict};

/// Map a runner's raw outcome onto a [`Verdict`].
///
/// A process exit code is authoritative: exit 0 passes even if the output
/// contained a summary with failures, and any other code fails. Crash
/// signals are never reported as test failures.
pub fn normalize(outcome: RawOutcome) -> Verdict {
    match outcome {
        RawOutcome::Exited { code: 0, .. } => Verdict::Passed,
        RawOutcome::Exited { summary, .. } => Verdict::Failed {
            total: summary.map(|s| s.total),
            failed: summary.map(|s| s.failed),
        },
        RawOutcome::Reported { failed: 0, .. } => Verdict::Passed,
        RawOutcome::Reported { total, failed } => Verdict::Failed {
            total: Some(total),
            failed: Some(failed),
        },
        RawOutcome::Crashed(reason) => Verdict::Crashed { reason },
    }
}
