//! Runner selection by target environment

use std::sync::Arc;

use tracing::debug;

use crate::{
    config::Config,
    types::Environment,
};

use super::{
    browser::BrowserRunner,
    process_runner::ProcessRunner,
    traits::Runner,
};

/// The two runner families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerKind {
    Process,
    Browser,
}

impl RunnerKind {
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Wasmer | Environment::Node => RunnerKind::Process,
            Environment::DefaultBrowser => RunnerKind::Browser,
        }
    }
}

/// Holds one runner per family and hands out the right one for an
/// environment
#[derive(Clone)]
pub struct UnifiedRunner {
    process: Arc<dyn Runner>,
    browser: Arc<dyn Runner>,
}

impl UnifiedRunner {
    pub fn new(process: Arc<dyn Runner>, browser: Arc<dyn Runner>) -> Self {
        Self { process, browser }
    }

    /// Create the real process and browser runners from a config
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(ProcessRunner::from_config(&config.runtimes)),
            Arc::new(BrowserRunner::from_config(&config.browser)),
        )
    }

    /// Get the runner for a runner family
    pub fn get_runner(&self, kind: RunnerKind) -> &Arc<dyn Runner> {
        match kind {
            RunnerKind::Process => &self.process,
            RunnerKind::Browser => &self.browser,
        }
    }

    /// Get the runner that executes bundles built for `environment`
    pub fn runner_for(&self, environment: Environment) -> &Arc<dyn Runner> {
        let kind = RunnerKind::for_environment(environment);
        let runner = self.get_runner(kind);
        debug!("Selected {} runner for {}", runner.name(), environment);
        runner
    }
}
