//! wasm-runner - Build WebAssembly test bundles and run them where they belong
//!
//! This crate provides functionality to:
//! - Describe a build with a [`BuildFlavor`] and produce a test bundle through a [`Builder`]
//! - Run the bundle in a command-line runtime (`wasmer`, `node`) or a browser over WebDriver
//! - Normalize every runner's result into one [`Verdict`] with a stable exit code
pub mod builder;
pub mod command;
pub mod config;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod runners;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use types::*;

// Re-export main API components
pub use builder::{Builder, ToolchainBuilder};
pub use config::Config;
pub use normalize::normalize;
pub use orchestrator::Orchestrator;
pub use runners::{BrowserRunner, ProcessRunner, Runner, UnifiedRunner};
