use std::path::PathBuf;

use super::Environment;

/// Per-invocation options that do not affect how the bundle is built
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Use this bundle instead of building one
    pub prebuilt_bundle_path: Option<PathBuf>,
    /// Ask the browser for a headless session
    pub headless: bool,
    /// Port for the browser harness server; ephemeral when unset
    pub port: Option<u16>,
}

/// Everything a runner needs to execute one bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub bundle: PathBuf,
    pub environment: Environment,
    pub options: RunOptions,
}

impl RunRequest {
    pub fn new(bundle: impl Into<PathBuf>, environment: Environment, options: RunOptions) -> Self {
        Self {
            bundle: bundle.into(),
            environment,
            options,
        }
    }
}
