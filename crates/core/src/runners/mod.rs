//! Runners that execute a test bundle in its target environment

pub mod browser;
pub mod process_runner;
pub mod traits;
pub mod unified_runner;

// Re-export main types
pub use browser::BrowserRunner;
pub use process_runner::ProcessRunner;
pub use traits::Runner;
pub use unified_runner::{RunnerKind, UnifiedRunner};
