use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable naming an already running WebDriver endpoint
pub const WEBDRIVER_REMOTE_URL_ENV: &str = "WEBDRIVER_REMOTE_URL";

/// How long the browser runner waits for the harness to report, unless
/// configured otherwise
pub const DEFAULT_REPORT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BrowserConfig {
    /// Port for the harness server when `--port` is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_timeout_secs: Option<u64>,
    /// Connect to this WebDriver endpoint instead of spawning a driver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webdriver_url: Option<String>,
    /// Driver executable to spawn instead of searching `PATH`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
}

impl BrowserConfig {
    pub fn report_timeout(&self) -> Duration {
        self.report_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REPORT_TIMEOUT)
    }

    /// The remote WebDriver URL, with the environment variable taking
    /// precedence over the config file
    pub fn webdriver_url(&self) -> Option<String> {
        std::env::var(WEBDRIVER_REMOTE_URL_ENV)
            .ok()
            .filter(|url| !url.is_empty())
            .or_else(|| self.webdriver_url.clone())
    }
}
