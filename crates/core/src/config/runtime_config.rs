use serde::{Deserialize, Serialize};

pub const DEFAULT_WASMER: &str = "wasmer";
pub const DEFAULT_NODE: &str = "node";

/// Executables used by the process runner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuntimeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wasmer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    /// Arguments placed between the runtime and the bundle.
    /// Defaults to `["run"]` for wasmer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wasmer_args: Option<Vec<String>>,
    /// Arguments placed between node and the loader script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_args: Option<Vec<String>>,
}

impl RuntimeConfig {
    pub fn wasmer(&self) -> &str {
        self.wasmer.as_deref().unwrap_or(DEFAULT_WASMER)
    }

    pub fn node(&self) -> &str {
        self.node.as_deref().unwrap_or(DEFAULT_NODE)
    }

    pub fn wasmer_args(&self) -> Vec<String> {
        self.wasmer_args
            .clone()
            .unwrap_or_else(|| vec!["run".to_string()])
    }

    pub fn node_args(&self) -> Vec<String> {
        self.node_args
            .clone()
            .unwrap_or_else(|| vec!["--experimental-wasi-unstable-preview1".to_string()])
    }
}
