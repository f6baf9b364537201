//! Browser runner: serves the bundle from a local harness server and drives a
//! WebDriver session to it until the page reports results.

pub mod harness;
pub mod report;
pub mod server;
pub mod webdriver;

pub use report::{HarnessReport, OutputLine, OutputStream};
pub use server::HarnessServer;
pub use webdriver::{
    DriverKind, RemoteSession, SessionOptions, SessionProvider, WebDriverProvider,
    WebDriverSession,
};

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::BrowserConfig,
    error::Error,
    types::{CrashReason, RawOutcome, RunRequest},
};

use super::traits::Runner;

/// How often the browser session is checked while waiting for a report
pub const SESSION_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct BrowserRunner {
    sessions: Arc<dyn SessionProvider>,
    report_timeout: Duration,
    poll_interval: Duration,
    default_port: Option<u16>,
}

impl BrowserRunner {
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            sessions: Arc::new(WebDriverProvider::from_config(config)),
            report_timeout: config.report_timeout(),
            poll_interval: SESSION_POLL_INTERVAL,
            default_port: config.port,
        }
    }

    pub fn with_report_timeout(mut self, timeout: Duration) -> Self {
        self.report_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Open sessions through `sessions` instead of a WebDriver endpoint
    pub fn with_session_provider(mut self, sessions: Arc<dyn SessionProvider>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn report_timeout(&self) -> Duration {
        self.report_timeout
    }

    async fn run(&self, request: &RunRequest, cancel: CancellationToken) -> RawOutcome {
        let port = request.options.port.or(self.default_port);
        let mut server = match HarnessServer::start(&request.bundle, port).await {
            Ok(server) => server,
            Err(e) => {
                return RawOutcome::Crashed(CrashReason::Internal(format!(
                    "cannot start harness server: {e}"
                )));
            }
        };

        // Session start-up and navigation count against the report timeout
        let deadline = tokio::time::sleep(self.report_timeout);
        tokio::pin!(deadline);

        let options = SessionOptions {
            headless: request.options.headless,
        };
        let opened = tokio::select! {
            opened = self.sessions.open(options) => Ok(opened),
            _ = cancel.cancelled() => Err(CrashReason::Cancelled),
            _ = deadline.as_mut() => {
                warn!("Browser session not ready after {}s", self.report_timeout.as_secs());
                Err(CrashReason::Timeout)
            }
        };

        let mut session = match opened {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                server.shutdown().await;
                let detail = match e {
                    Error::DriverUnavailable(detail) => detail,
                    other => other.to_string(),
                };
                return RawOutcome::Crashed(CrashReason::DriverUnavailable(detail));
            }
            Err(reason) => {
                server.shutdown().await;
                return RawOutcome::Crashed(reason);
            }
        };

        let outcome = self
            .wait_for_report(&mut server, session.as_mut(), &cancel, deadline)
            .await;

        // Session first, so the page stops talking to the server
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }
        drop(session);
        server.shutdown().await;

        outcome
    }

    async fn wait_for_report(
        &self,
        server: &mut HarnessServer,
        session: &mut dyn RemoteSession,
        cancel: &CancellationToken,
        mut deadline: Pin<&mut Sleep>,
    ) -> RawOutcome {
        let url = server.url();
        info!("Opening {}", url);

        let navigated = tokio::select! {
            navigated = session.navigate(&url) => navigated,
            _ = cancel.cancelled() => return RawOutcome::Crashed(CrashReason::Cancelled),
            _ = deadline.as_mut() => return RawOutcome::Crashed(CrashReason::Timeout),
        };
        if let Err(e) = navigated {
            return RawOutcome::Crashed(CrashReason::PageUnresponsive(format!(
                "navigation to {url} failed: {e}"
            )));
        }

        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        poll.tick().await;

        loop {
            tokio::select! {
                biased;

                report = server.next_report() => {
                    return match report {
                        Some(report) => {
                            debug!("Received harness report");
                            report.into_outcome()
                        }
                        None => RawOutcome::Crashed(CrashReason::Internal(
                            "harness server stopped before a report arrived".to_string(),
                        )),
                    };
                }
                _ = cancel.cancelled() => return RawOutcome::Crashed(CrashReason::Cancelled),
                _ = deadline.as_mut() => {
                    warn!("No report after {}s", self.report_timeout.as_secs());
                    return RawOutcome::Crashed(CrashReason::Timeout);
                }
                _ = poll.tick() => {
                    if let Err(e) = session.probe().await {
                        return RawOutcome::Crashed(CrashReason::PageUnresponsive(e.to_string()));
                    }
                }
            }
        }
    }
}

impl Default for BrowserRunner {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default())
    }
}

#[async_trait]
impl Runner for BrowserRunner {
    async fn execute(&self, request: &RunRequest, cancel: CancellationToken) -> RawOutcome {
        self.run(request, cancel).await
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_REPORT_TIMEOUT;

    #[test]
    fn test_report_timeout_defaults_and_overrides() {
        let runner = BrowserRunner::default();
        assert_eq!(runner.report_timeout(), DEFAULT_REPORT_TIMEOUT);

        let configured = BrowserRunner::from_config(&BrowserConfig {
            report_timeout_secs: Some(5),
            ..Default::default()
        });
        assert_eq!(configured.report_timeout(), Duration::from_secs(5));

        let overridden = configured.with_report_timeout(Duration::from_millis(50));
        assert_eq!(overridden.report_timeout(), Duration::from_millis(50));
    }
}
