use crate::{
    error::{Error, Result},
    types::Environment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{BrowserConfig, RuntimeConfig, ToolchainConfig};

/// Config file names, in lookup order within a directory
pub const CONFIG_FILE_NAMES: [&str; 2] = [".wasm-runner.json", "wasm-runner.json"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Environment used when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    /// Compiler flags placed before any given on the command line
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compiler_flags: Vec<String>,

    #[serde(default)]
    pub toolchain: ToolchainConfig,
    #[serde(default)]
    pub runtimes: RuntimeConfig,
    #[serde(default)]
    pub browser: BrowserConfig,

    // Directory the config was loaded from (internal, not exposed in JSON)
    #[serde(skip)]
    pub root: Option<PathBuf>,
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&contents).map_err(|e| {
            Error::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })?;
        // A bare relative file name has an empty parent
        let path = std::path::absolute(path)?;
        config.root = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            for name in CONFIG_FILE_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    return Some(config_path);
                }
            }

            current = current.parent()?;
        }
    }

    /// Load the nearest config file above `start_path`, or the defaults when
    /// there is none
    pub fn discover(start_path: &Path) -> Result<Self> {
        match Self::find_config_file(start_path) {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                debug!("No config file found above {}", start_path.display());
                Ok(Self::default())
            }
        }
    }

    /// Directory builds run in and relative paths resolve against
    pub fn project_root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}
