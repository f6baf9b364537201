//! Minimal W3C WebDriver client: create a session, navigate, probe and delete

use std::net::{Ipv4Addr, TcpListener as StdTcpListener};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    command::ToolCommand,
    config::BrowserConfig,
    error::{Error, Result},
};

/// How long a spawned driver may take to answer `/status` with `ready`
pub const DRIVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for one liveness probe. A probe that times out counts as alive
/// because the page may be busy running tests.
pub const LIVENESS_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Message for a run where no driver could be located
pub const DRIVER_NOT_FOUND: &str = "driver executable not found";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub headless: bool,
}

/// An open browser session
#[async_trait]
pub trait RemoteSession: Send + Sync {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Fails when the browser or page is no longer reachable
    async fn probe(&mut self) -> Result<()>;

    /// End the session and release what it holds. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Opens browser sessions
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Open a session, failing with [`Error::DriverUnavailable`] when no
    /// browser can be reached
    async fn open(&self, options: SessionOptions) -> Result<Box<dyn RemoteSession>>;
}

/// Browser drivers that can be discovered on `PATH`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Chrome,
    Firefox,
    Edge,
    Safari,
}

impl DriverKind {
    /// Discovery order
    pub const ALL: [DriverKind; 4] = [
        DriverKind::Chrome,
        DriverKind::Firefox,
        DriverKind::Edge,
        DriverKind::Safari,
    ];

    pub fn executable(self) -> &'static str {
        match self {
            DriverKind::Chrome => "chromedriver",
            DriverKind::Firefox => "geckodriver",
            DriverKind::Edge => "msedgedriver",
            DriverKind::Safari => "safaridriver",
        }
    }

    /// Guess the driver from an executable path, for configured drivers
    pub fn from_executable(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| stem.contains(kind.executable()))
    }

    pub fn port_args(self, port: u16) -> Vec<String> {
        match self {
            DriverKind::Chrome | DriverKind::Edge => vec![format!("--port={port}")],
            DriverKind::Firefox | DriverKind::Safari => {
                vec!["--port".to_string(), port.to_string()]
            }
        }
    }

    /// `alwaysMatch` capabilities for a new session
    pub fn capabilities(self, headless: bool) -> Value {
        let mut caps = match self {
            DriverKind::Chrome => json!({ "browserName": "chrome" }),
            DriverKind::Firefox => json!({ "browserName": "firefox" }),
            DriverKind::Edge => json!({ "browserName": "MicrosoftEdge" }),
            DriverKind::Safari => json!({ "browserName": "safari" }),
        };

        if headless {
            match self {
                DriverKind::Chrome => {
                    caps["goog:chromeOptions"] = json!({ "args": ["--headless=new"] })
                }
                DriverKind::Firefox => {
                    caps["moz:firefoxOptions"] = json!({ "args": ["-headless"] })
                }
                DriverKind::Edge => caps["ms:edgeOptions"] = json!({ "args": ["--headless=new"] }),
                DriverKind::Safari => warn!("safaridriver does not support headless sessions"),
            }
        }

        caps
    }
}

/// Capabilities for an endpoint whose browser is unknown
pub fn remote_capabilities(headless: bool) -> Value {
    if !headless {
        return json!({});
    }
    json!({
        "goog:chromeOptions": { "args": ["--headless=new"] },
        "moz:firefoxOptions": { "args": ["-headless"] },
        "ms:edgeOptions": { "args": ["--headless=new"] },
    })
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSession {
    session_id: String,
}

async fn send(request: RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    let body: WireResponse = response.json().await?;

    if status.is_success() {
        return Ok(body.value);
    }

    match serde_json::from_value::<WireError>(body.value) {
        Ok(err) => Err(Error::Other(format!(
            "WebDriver {}: {} {}",
            status, err.error, err.message
        ))),
        Err(_) => Err(Error::Other(format!("WebDriver {status}"))),
    }
}

/// A driver executable spawned for one session
struct DriverProcess {
    child: Child,
    name: String,
}

impl DriverProcess {
    async fn stop(mut self) {
        debug!("Stopping {}", self.name);
        if let Err(e) = self.child.kill().await {
            warn!("Failed to stop {}: {}", self.name, e);
        }
    }
}

/// A session on a WebDriver endpoint, optionally owning the driver process
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
    driver: Option<DriverProcess>,
    closed: bool,
}

impl WebDriverSession {
    fn session_url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }
}

#[async_trait]
impl RemoteSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        debug!("Navigating session {} to {}", self.session_id, url);
        send(
            self.client
                .post(self.session_url("/url"))
                .json(&json!({ "url": url })),
        )
        .await?;
        Ok(())
    }

    async fn probe(&mut self) -> Result<()> {
        let request = self
            .client
            .get(self.session_url("/url"))
            .timeout(LIVENESS_PROBE_TIMEOUT);
        match send(request).await {
            Ok(_) => Ok(()),
            Err(Error::HttpError(e)) if e.is_timeout() => {
                debug!("Liveness probe timed out, page is busy");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        debug!("Deleting session {}", self.session_id);
        let result = send(self.client.delete(self.session_url(""))).await;

        if let Some(driver) = self.driver.take() {
            driver.stop().await;
        }

        result.map(|_| ())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        // Finish the cleanup in the background when the run was aborted
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let client = self.client.clone();
        let url = self.session_url("");
        let driver = self.driver.take();
        handle.spawn(async move {
            let _ = client.delete(url).send().await;
            if let Some(driver) = driver {
                driver.stop().await;
            }
        });
    }
}

/// Opens sessions on a remote endpoint, or on a driver spawned from `PATH`
pub struct WebDriverProvider {
    client: Client,
    remote_url: Option<String>,
    driver: Option<String>,
}

impl WebDriverProvider {
    pub fn new(remote_url: Option<String>, driver: Option<String>) -> Self {
        Self {
            client: Client::new(),
            remote_url,
            driver,
        }
    }

    pub fn from_config(config: &BrowserConfig) -> Self {
        Self::new(config.webdriver_url(), config.driver.clone())
    }

    /// Locate the driver executable: the configured one, else the first known
    /// driver on `PATH`
    pub fn discover_driver(&self) -> Option<(PathBuf, DriverKind)> {
        if let Some(driver) = &self.driver {
            let path = which::which(driver).ok()?;
            let kind = DriverKind::from_executable(&path).unwrap_or(DriverKind::Chrome);
            return Some((path, kind));
        }

        DriverKind::ALL.into_iter().find_map(|kind| {
            which::which(kind.executable())
                .ok()
                .map(|path| (path, kind))
        })
    }

    async fn create_session(
        &self,
        base_url: &str,
        capabilities: Value,
        driver: Option<DriverProcess>,
    ) -> Result<WebDriverSession> {
        let mut capabilities = capabilities;
        capabilities["pageLoadStrategy"] = json!("none");
        let body = json!({ "capabilities": { "alwaysMatch": capabilities } });

        let value = send(self.client.post(format!("{base_url}/session")).json(&body))
            .await
            .map_err(|e| Error::DriverUnavailable(format!("cannot create session: {e}")))?;
        let session: NewSession = serde_json::from_value(value)?;
        info!("Opened WebDriver session {}", session.session_id);

        Ok(WebDriverSession {
            client: self.client.clone(),
            base_url: base_url.to_string(),
            session_id: session.session_id,
            driver,
            closed: false,
        })
    }

    async fn spawn_driver(&self, path: &Path, kind: DriverKind) -> Result<(String, DriverProcess)> {
        let port = free_port()?;
        let command = ToolCommand::new(path.display().to_string()).args(kind.port_args(port));
        info!("Starting driver: {}", command.to_shell_command());

        let mut child = command
            .to_tokio_command()
            .spawn()
            .map_err(|e| Error::DriverUnavailable(format!("cannot start {}: {e}", path.display())))?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(drain_to_log(stdout, kind.executable()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_to_log(stderr, kind.executable()));
        }

        let mut driver = DriverProcess {
            child,
            name: kind.executable().to_string(),
        };
        let base_url = format!("http://{}:{}", Ipv4Addr::LOCALHOST, port);

        match self.wait_until_ready(&base_url, &mut driver).await {
            Ok(()) => Ok((base_url, driver)),
            Err(e) => {
                driver.stop().await;
                Err(e)
            }
        }
    }

    async fn wait_until_ready(&self, base_url: &str, driver: &mut DriverProcess) -> Result<()> {
        let deadline = Instant::now() + DRIVER_STARTUP_TIMEOUT;

        loop {
            if let Ok(Some(status)) = driver.child.try_wait() {
                return Err(Error::DriverUnavailable(format!(
                    "{} exited during start-up: {status}",
                    driver.name
                )));
            }

            if let Ok(value) = send(self.client.get(format!("{base_url}/status"))).await {
                if value["ready"].as_bool().unwrap_or(false) {
                    debug!("{} is ready", driver.name);
                    return Ok(());
                }
            }

            if Instant::now() >= deadline {
                return Err(Error::DriverUnavailable(format!(
                    "{} not ready after {}s",
                    driver.name,
                    DRIVER_STARTUP_TIMEOUT.as_secs()
                )));
            }
            tokio::time::sleep(STATUS_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl SessionProvider for WebDriverProvider {
    async fn open(&self, options: SessionOptions) -> Result<Box<dyn RemoteSession>> {
        if let Some(remote) = &self.remote_url {
            let base_url = remote.trim_end_matches('/');
            info!("Using WebDriver endpoint {}", base_url);
            let session = self
                .create_session(base_url, remote_capabilities(options.headless), None)
                .await?;
            return Ok(Box::new(session));
        }

        let Some((path, kind)) = self.discover_driver() else {
            return Err(Error::DriverUnavailable(DRIVER_NOT_FOUND.to_string()));
        };

        let (base_url, driver) = self.spawn_driver(&path, kind).await?;
        let session = self
            .create_session(&base_url, kind.capabilities(options.headless), Some(driver))
            .await?;
        Ok(Box::new(session))
    }
}

fn free_port() -> Result<u16> {
    let listener = StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}

async fn drain_to_log(stream: impl AsyncRead + Unpin, name: &'static str) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("[{}] {}", name, line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_capabilities() {
        let chrome = DriverKind::Chrome.capabilities(true);
        assert_eq!(chrome["browserName"], "chrome");
        assert_eq!(chrome["goog:chromeOptions"]["args"][0], "--headless=new");

        let firefox = DriverKind::Firefox.capabilities(true);
        assert_eq!(firefox["moz:firefoxOptions"]["args"][0], "-headless");

        let edge = DriverKind::Edge.capabilities(true);
        assert_eq!(edge["ms:edgeOptions"]["args"][0], "--headless=new");

        let windowed = DriverKind::Chrome.capabilities(false);
        assert!(windowed.get("goog:chromeOptions").is_none());
    }

    #[test]
    fn test_driver_kind_from_executable() {
        assert_eq!(
            DriverKind::from_executable(Path::new("/usr/local/bin/geckodriver")),
            Some(DriverKind::Firefox)
        );
        assert_eq!(
            DriverKind::from_executable(Path::new("C:\\tools\\chromedriver.exe")),
            Some(DriverKind::Chrome)
        );
        assert_eq!(DriverKind::from_executable(Path::new("/bin/true")), None);
    }

    #[test]
    fn test_port_args() {
        assert_eq!(DriverKind::Chrome.port_args(4444), vec!["--port=4444"]);
        assert_eq!(DriverKind::Firefox.port_args(4444), vec!["--port", "4444"]);
    }

    #[tokio::test]
    async fn test_missing_configured_driver_is_unavailable() {
        let provider = WebDriverProvider::new(
            None,
            Some("definitely-not-a-webdriver-executable".to_string()),
        );
        match provider.open(SessionOptions::default()).await {
            Err(Error::DriverUnavailable(message)) => assert_eq!(message, DRIVER_NOT_FOUND),
            Err(other) => panic!("expected DriverUnavailable, got {other:?}"),
            Ok(_) => panic!("expected DriverUnavailable"),
        }
    }
}
