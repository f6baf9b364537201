use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::types::Environment;

pub const DEFAULT_TOOLCHAIN_PROGRAM: &str = "swift";
pub const DEFAULT_TRIPLE: &str = "wasm32-unknown-wasi";
pub const DEFAULT_BUILD_DIR: &str = ".build";
pub const DEFAULT_FLAG_PREFIX: &str = "-Xswiftc";

/// How the compiler is invoked to produce a test bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ToolchainConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Arguments placed right after the program, before any flavor flags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triple: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,
    /// Prefix emitted before every forwarded compiler flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_prefix: Option<String>,
    /// Extra raw arguments appended only when building for an environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_args: Option<HashMap<Environment, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
}

impl ToolchainConfig {
    pub fn program(&self) -> &str {
        self.program.as_deref().unwrap_or(DEFAULT_TOOLCHAIN_PROGRAM)
    }

    pub fn args(&self) -> Vec<String> {
        self.args
            .clone()
            .unwrap_or_else(|| vec!["build".to_string(), "--build-tests".to_string()])
    }

    pub fn triple(&self) -> &str {
        self.triple.as_deref().unwrap_or(DEFAULT_TRIPLE)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.build_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR))
    }

    pub fn flag_prefix(&self) -> &str {
        self.flag_prefix.as_deref().unwrap_or(DEFAULT_FLAG_PREFIX)
    }

    pub fn environment_args(&self, environment: Environment) -> &[String] {
        self.environment_args
            .as_ref()
            .and_then(|args| args.get(&environment))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
