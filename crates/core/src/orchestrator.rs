//! Ties building, running and normalization together for one invocation

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    builder::{Builder, ToolchainBuilder},
    config::Config,
    error::{Error, Result},
    normalize::normalize,
    runners::UnifiedRunner,
    types::{BuildFlavor, RunOptions, RunRequest, Verdict},
};

pub struct Orchestrator {
    builder: Arc<dyn Builder>,
    runners: UnifiedRunner,
}

impl Orchestrator {
    pub fn new(builder: Arc<dyn Builder>, runners: UnifiedRunner) -> Self {
        Self { builder, runners }
    }

    /// Wire the toolchain builder and real runners. Builds run in the
    /// directory the config was found in, else in `project_root`.
    pub fn from_config(config: &Config, project_root: &Path) -> Self {
        let root = config.project_root().unwrap_or(project_root);
        Self::new(
            Arc::new(ToolchainBuilder::new(config.toolchain.clone(), root)),
            UnifiedRunner::from_config(config),
        )
    }

    /// Produce (or reuse) the bundle for `flavor`, run it and return the
    /// verdict. Errors mean no test ran.
    pub async fn run(
        &self,
        flavor: &BuildFlavor,
        options: &RunOptions,
        cancel: CancellationToken,
    ) -> Result<Verdict> {
        let bundle = match &options.prebuilt_bundle_path {
            Some(path) => {
                check_prebuilt_bundle(path).await?;
                info!("Using prebuilt bundle {}", path.display());
                path.clone()
            }
            None => {
                debug!("Building {:?}", flavor);
                // Dropping the build future kills the compiler
                tokio::select! {
                    built = self.builder.build(flavor) => built?,
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                }
            }
        };

        let runner = self.runners.runner_for(flavor.environment);
        info!(
            "Running {} with the {} runner ({})",
            bundle.display(),
            runner.name(),
            flavor.environment
        );

        let request = RunRequest::new(bundle, flavor.environment, options.clone());
        let raw = runner.execute(&request, cancel).await;
        debug!("Raw outcome: {:?}", raw);

        let verdict = normalize(raw);
        info!("Verdict: {}", verdict);
        Ok(verdict)
    }
}

/// The bundle must be an existing, readable file
async fn check_prebuilt_bundle(path: &Path) -> Result<()> {
    let is_file = tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file || tokio::fs::File::open(path).await.is_err() {
        return Err(Error::MissingArtifact(path.to_path_buf()));
    }
    Ok(())
}
