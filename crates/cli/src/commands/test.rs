use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wasm_runner_core::{Config, Orchestrator, RunOptions, Verdict};

use crate::cli::FlavorArgs;

/// Options of `wasm-runner test` that do not shape the build
#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    pub prebuilt_test_bundle_path: Option<PathBuf>,
    pub headless: bool,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub json: bool,
}

pub fn test_command(flavor_args: FlavorArgs, options: TestOptions) -> Result<i32> {
    let cwd = env::current_dir().context("Failed to get current directory")?;

    let config = match &options.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::discover(&cwd).context("Failed to load config")?,
    };
    let flavor = flavor_args
        .into_flavor(&config)
        .context("Invalid test options")?;
    debug!("Build flavor: {:?}", flavor);

    if flavor.environment.is_command_line() && (options.headless || options.port.is_some()) {
        warn!(
            "--headless and --port only apply to defaultBrowser, ignoring them for {}",
            flavor.environment
        );
    }

    let run_options = RunOptions {
        prebuilt_bundle_path: options.prebuilt_test_bundle_path.map(|path| cwd.join(path)),
        headless: options.headless,
        port: options.port,
    };

    if !options.json {
        println!(
            "🧪 Testing for {} ({})",
            flavor.environment,
            flavor.configuration()
        );
    }

    let orchestrator = Orchestrator::from_config(&config, &cwd);
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    let verdict = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping the test run");
                on_interrupt.cancel();
            }
        });

        orchestrator.run(&flavor, &run_options, cancel).await
    })?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        print_verdict(&verdict);
    }

    Ok(verdict.exit_code())
}

fn print_verdict(verdict: &Verdict) {
    match verdict {
        Verdict::Passed => println!("✅ {verdict}"),
        Verdict::Failed { .. } => println!("❌ {verdict}"),
        Verdict::Crashed { .. } => eprintln!("💥 {verdict}"),
    }
}
