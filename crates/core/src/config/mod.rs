//! Configuration management for wasm-runner

mod browser_config;
mod runtime_config;
mod settings;
mod toolchain_config;

// Re-export main types
pub use browser_config::{BrowserConfig, DEFAULT_REPORT_TIMEOUT, WEBDRIVER_REMOTE_URL_ENV};
pub use runtime_config::RuntimeConfig;
pub use settings::{CONFIG_FILE_NAMES, Config};
pub use toolchain_config::ToolchainConfig;
