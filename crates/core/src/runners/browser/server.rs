//! Local HTTP server the browser loads the test bundle from

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::harness::{HARNESS_JS, INDEX_HTML};
use super::report::{HarnessReport, OutputLine, OutputStream};
use crate::error::Result;

/// How long in-flight connections may keep the server alive after shutdown
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Clone)]
struct HarnessState {
    bundle: Arc<PathBuf>,
    resource_dir: Arc<PathBuf>,
    reported: Arc<AtomicBool>,
    reports: mpsc::Sender<HarnessReport>,
}

/// A running harness server bound to `127.0.0.1`.
///
/// Dropping the server stops it; [`HarnessServer::shutdown`] additionally
/// waits until the listener is closed.
pub struct HarnessServer {
    addr: SocketAddr,
    reports: mpsc::Receiver<HarnessReport>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl HarnessServer {
    /// Bind to `port` (ephemeral when `None`) and start serving `bundle`
    pub async fn start(bundle: &FsPath, port: Option<u16>) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port.unwrap_or(0))).await?;
        let addr = listener.local_addr()?;

        let (report_tx, report_rx) = mpsc::channel(1);
        let state = HarnessState {
            bundle: Arc::new(bundle.to_path_buf()),
            resource_dir: Arc::new(
                bundle
                    .parent()
                    .map(FsPath::to_path_buf)
                    .unwrap_or_default(),
            ),
            reported: Arc::new(AtomicBool::new(false)),
            reports: report_tx,
        };

        let router = Router::new()
            .route("/", get(index))
            .route("/index.html", get(index))
            .route("/harness.js", get(harness_js))
            .route("/bundle.wasm", get(bundle_wasm))
            .route("/resources/{name}", get(resource))
            .route("/report", post(report))
            .route("/output", post(output))
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                warn!("Harness server error: {}", e);
            }
        });

        info!("Harness server listening on http://{}", addr);

        Ok(Self {
            addr,
            reports: report_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL of the harness page
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Wait for the terminal report. Only the first report ever arrives here.
    pub async fn next_report(&mut self) -> Option<HarnessReport> {
        self.reports.recv().await
    }

    /// Stop accepting connections and wait for the listener to close
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                debug!("Harness server still busy after grace period, aborting");
                task.abort();
                let _ = task.await;
            }
        }

        debug!("Harness server on {} stopped", self.addr);
    }
}

impl Drop for HarnessServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn harness_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/javascript")], HARNESS_JS)
}

async fn bundle_wasm(State(state): State<HarnessState>) -> Response {
    serve_file(&state.bundle).await
}

async fn resource(State(state): State<HarnessState>, Path(name): Path<String>) -> Response {
    if !is_plain_file_name(&name) {
        warn!("Rejected resource request for {:?}", name);
        return StatusCode::NOT_FOUND.into_response();
    }
    serve_file(&state.resource_dir.join(name)).await
}

async fn report(
    State(state): State<HarnessState>,
    Json(report): Json<HarnessReport>,
) -> StatusCode {
    if !report.is_consistent() {
        warn!("Rejecting harness report with more failures than tests: {:?}", report);
        return StatusCode::UNPROCESSABLE_ENTITY;
    }

    if state
        .reported
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        warn!("Ignoring additional harness report: {:?}", report);
        return StatusCode::CONFLICT;
    }

    debug!("Harness report: {:?}", report);
    // The receiver is gone only when the run already ended
    let _ = state.reports.try_send(report);
    StatusCode::OK
}

async fn output(Json(line): Json<OutputLine>) -> StatusCode {
    match line.stream {
        OutputStream::Stdout => println!("{}", line.text),
        OutputStream::Stderr => eprintln!("{}", line.text),
    }
    StatusCode::NO_CONTENT
}

async fn serve_file(path: &FsPath) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(path))], bytes).into_response(),
        Err(e) => {
            debug!("Cannot serve {}: {}", path.display(), e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// A single path segment that cannot leave the resource directory
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}

fn content_type(path: &FsPath) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("wasm") => "application/wasm",
        Some("js" | "mjs") => "text/javascript",
        Some("html") => "text/html",
        Some("json") => "application/json",
        Some("css") => "text/css",
        _ => "application/octet-stream",
    }
}
