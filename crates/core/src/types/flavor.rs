//! Build flavor: the policy describing how a test bundle is produced

use serde::{Deserialize, Serialize};

use super::{Environment, SanitizeVariant};
use crate::error::Result;

/// A single build request.
///
/// Created once per invocation and never mutated afterwards. Compiler flags
/// keep their order and are handed to the builder verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildFlavor {
    pub is_release: bool,
    pub environment: Environment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitize: Option<SanitizeVariant>,
    #[serde(default)]
    pub compiler_flags: Vec<String>,
}

impl BuildFlavor {
    pub fn new(
        is_release: bool,
        environment: Environment,
        sanitize: Option<SanitizeVariant>,
        compiler_flags: Vec<String>,
    ) -> Self {
        Self {
            is_release,
            environment,
            sanitize,
            compiler_flags,
        }
    }

    /// Build a flavor from user-supplied names, rejecting unknown
    /// environments and sanitizers with a configuration error.
    pub fn parse(
        is_release: bool,
        environment: &str,
        sanitize: Option<&str>,
        compiler_flags: Vec<String>,
    ) -> Result<Self> {
        let environment = environment.parse::<Environment>()?;
        let sanitize = sanitize.map(str::parse::<SanitizeVariant>).transpose()?;
        Ok(Self::new(is_release, environment, sanitize, compiler_flags))
    }

    /// Build directory name for this flavor's configuration
    pub fn configuration(&self) -> &'static str {
        if self.is_release { "release" } else { "debug" }
    }

    /// Command-line arguments that reproduce this flavor when passed to
    /// `wasm-runner test`.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["--environment".to_string(), self.environment.to_string()];

        if self.is_release {
            args.push("--release".to_string());
        }

        if let Some(sanitize) = &self.sanitize {
            args.push("--sanitize".to_string());
            args.push(sanitize.to_string());
        }

        // `=` keeps flags that start with a dash from being read as options
        for flag in &self.compiler_flags {
            args.push(format!("--compiler-flag={flag}"));
        }

        args
    }
}
