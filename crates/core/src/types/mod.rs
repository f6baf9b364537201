pub mod environment;
pub mod flavor;
pub mod outcome;
pub mod request;

// Re-export commonly used types
pub use environment::{Environment, SanitizeVariant};
pub use flavor::BuildFlavor;
pub use outcome::{
    CrashReason, EXIT_CRASHED, EXIT_FAILED, EXIT_PASSED, RawOutcome, TestSummary, Verdict,
};
pub use request::{RunOptions, RunRequest};
