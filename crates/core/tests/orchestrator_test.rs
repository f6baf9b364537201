//! Integration tests for the build -> run -> normalize pipeline

use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wasm_runner_core::{
    BuildFlavor, Builder, CrashReason, Environment, Error, Orchestrator, RawOutcome, Result,
    RunOptions, RunRequest, Runner, UnifiedRunner, Verdict,
};

enum BuildBehavior {
    Succeed(PathBuf),
    Fail(String),
    Hang,
}

struct SpyBuilder {
    calls: AtomicUsize,
    behavior: BuildBehavior,
}

impl SpyBuilder {
    fn new(behavior: BuildBehavior) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            behavior,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Builder for SpyBuilder {
    async fn build(&self, _flavor: &BuildFlavor) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            BuildBehavior::Succeed(path) => Ok(path.clone()),
            BuildBehavior::Fail(diagnostics) => Err(Error::BuildFailed(diagnostics.clone())),
            BuildBehavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

struct SpyRunner {
    name: &'static str,
    outcome: RawOutcome,
    requests: Mutex<Vec<RunRequest>>,
}

impl SpyRunner {
    fn new(name: &'static str, outcome: RawOutcome) -> Arc<Self> {
        Arc::new(Self {
            name,
            outcome,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Runner for SpyRunner {
    async fn execute(&self, request: &RunRequest, _cancel: CancellationToken) -> RawOutcome {
        self.requests.lock().unwrap().push(request.clone());
        self.outcome.clone()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

fn passed_exit() -> RawOutcome {
    RawOutcome::Exited {
        code: 0,
        stderr_tail: vec![],
        summary: None,
    }
}

fn orchestrator(
    builder: Arc<SpyBuilder>,
    process: Arc<SpyRunner>,
    browser: Arc<SpyRunner>,
) -> Orchestrator {
    Orchestrator::new(builder, UnifiedRunner::new(process, browser))
}

#[tokio::test]
async fn test_prebuilt_bundle_skips_builder() {
    let temp_dir = TempDir::new().unwrap();
    let bundle = temp_dir.path().join("AppPackageTests.wasm");
    fs::write(&bundle, b"\0asm").unwrap();

    let builder = SpyBuilder::new(BuildBehavior::Fail("must not build".to_string()));
    let process = SpyRunner::new("process", passed_exit());
    let browser = SpyRunner::new("browser", passed_exit());
    let orchestrator = orchestrator(builder.clone(), process.clone(), browser.clone());

    let options = RunOptions {
        prebuilt_bundle_path: Some(bundle.clone()),
        ..Default::default()
    };
    let flavor = BuildFlavor::new(false, Environment::Node, None, vec![]);
    let verdict = orchestrator
        .run(&flavor, &options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(verdict, Verdict::Passed);
    assert_eq!(builder.calls(), 0);
    let requests = process.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].bundle, bundle);
    assert_eq!(requests[0].environment, Environment::Node);
    assert!(browser.requests().is_empty());
}

#[tokio::test]
async fn test_missing_prebuilt_bundle() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("Gone.wasm");

    let builder = SpyBuilder::new(BuildBehavior::Succeed(missing.clone()));
    let process = SpyRunner::new("process", passed_exit());
    let browser = SpyRunner::new("browser", passed_exit());
    let orchestrator = orchestrator(builder.clone(), process.clone(), browser.clone());

    let options = RunOptions {
        prebuilt_bundle_path: Some(missing.clone()),
        ..Default::default()
    };
    let err = orchestrator
        .run(&BuildFlavor::default(), &options, CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::MissingArtifact(path) => assert_eq!(path, missing),
        other => panic!("expected MissingArtifact, got {other:?}"),
    }
    assert_eq!(builder.calls(), 0);
    assert!(process.requests().is_empty());
}

#[tokio::test]
async fn test_directory_is_not_a_bundle() {
    let temp_dir = TempDir::new().unwrap();

    let builder = SpyBuilder::new(BuildBehavior::Hang);
    let process = SpyRunner::new("process", passed_exit());
    let browser = SpyRunner::new("browser", passed_exit());
    let orchestrator = orchestrator(builder, process.clone(), browser);

    let options = RunOptions {
        prebuilt_bundle_path: Some(temp_dir.path().to_path_buf()),
        ..Default::default()
    };
    let result = orchestrator
        .run(&BuildFlavor::default(), &options, CancellationToken::new())
        .await;

    assert!(matches!(result, Err(Error::MissingArtifact(_))));
    assert!(process.requests().is_empty());
}

#[tokio::test]
async fn test_build_failure_never_runs() {
    let builder = SpyBuilder::new(BuildBehavior::Fail(
        "error: cannot find 'XCTAssertEqual' in scope".to_string(),
    ));
    let process = SpyRunner::new("process", passed_exit());
    let browser = SpyRunner::new("browser", passed_exit());
    let orchestrator = orchestrator(builder.clone(), process.clone(), browser.clone());

    let err = orchestrator
        .run(
            &BuildFlavor::default(),
            &RunOptions::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("cannot find 'XCTAssertEqual'"));
    assert_eq!(builder.calls(), 1);
    assert!(process.requests().is_empty());
    assert!(browser.requests().is_empty());
}

#[tokio::test]
async fn test_built_bundle_goes_to_browser_runner() {
    let bundle = PathBuf::from("/work/.build/wasm32-unknown-wasi/debug/AppPackageTests.wasm");
    let builder = SpyBuilder::new(BuildBehavior::Succeed(bundle.clone()));
    let process = SpyRunner::new("process", passed_exit());
    let browser = SpyRunner::new(
        "browser",
        RawOutcome::Reported {
            total: 4,
            failed: 2,
        },
    );
    let orchestrator = orchestrator(builder.clone(), process.clone(), browser.clone());

    let flavor = BuildFlavor::new(false, Environment::DefaultBrowser, None, vec![]);
    let options = RunOptions {
        headless: true,
        port: Some(8123),
        ..Default::default()
    };
    let verdict = orchestrator
        .run(&flavor, &options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        verdict,
        Verdict::Failed {
            total: Some(4),
            failed: Some(2)
        }
    );
    assert_eq!(verdict.exit_code(), 1);
    assert_eq!(builder.calls(), 1);
    assert!(process.requests().is_empty());

    let requests = browser.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].bundle, bundle);
    assert_eq!(requests[0].options, options);
}

#[tokio::test]
async fn test_runner_crash_is_a_verdict_not_an_error() {
    let builder = SpyBuilder::new(BuildBehavior::Succeed(PathBuf::from("a.wasm")));
    let process = SpyRunner::new(
        "process",
        RawOutcome::Crashed(CrashReason::RunnerUnavailable("`wasmer` not found".to_string())),
    );
    let browser = SpyRunner::new("browser", passed_exit());
    let orchestrator = orchestrator(builder, process, browser);

    let verdict = orchestrator
        .run(
            &BuildFlavor::default(),
            &RunOptions::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(matches!(
        verdict,
        Verdict::Crashed {
            reason: CrashReason::RunnerUnavailable(_)
        }
    ));
    assert_eq!(verdict.exit_code(), 2);
}

#[tokio::test]
async fn test_cancel_during_build() {
    let builder = SpyBuilder::new(BuildBehavior::Hang);
    let process = SpyRunner::new("process", passed_exit());
    let browser = SpyRunner::new("browser", passed_exit());
    let orchestrator = orchestrator(builder.clone(), process.clone(), browser);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.run(&BuildFlavor::default(), &RunOptions::default(), cancel),
    )
    .await
    .expect("cancellation should end the run");

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(builder.calls(), 1);
    assert!(process.requests().is_empty());
}

#[tokio::test]
async fn test_configuration_error_precedes_everything() {
    let builder = SpyBuilder::new(BuildBehavior::Succeed(PathBuf::from("a.wasm")));
    let process = SpyRunner::new("process", passed_exit());
    let browser = SpyRunner::new("browser", passed_exit());
    let orchestrator = orchestrator(builder.clone(), process.clone(), browser.clone());

    let result: Result<Verdict> = async {
        let flavor = BuildFlavor::parse(false, "deno", None, vec![])?;
        orchestrator
            .run(&flavor, &RunOptions::default(), CancellationToken::new())
            .await
    }
    .await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
    assert!(err.to_string().contains("wasmer"));
    assert_eq!(builder.calls(), 0);
    assert!(process.requests().is_empty());
    assert!(browser.requests().is_empty());

    // The same orchestrator builds and runs once the flavor resolves
    let flavor = BuildFlavor::parse(false, "WASMER", None, vec![]).unwrap();
    let verdict = orchestrator
        .run(&flavor, &RunOptions::default(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(verdict, Verdict::Passed);
    assert_eq!(builder.calls(), 1);
    assert_eq!(process.requests().len(), 1);
}
