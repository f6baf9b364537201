//! Producing test bundles from a build flavor

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{
    command::CommandBuilder,
    config::ToolchainConfig,
    error::{Error, Result},
    types::BuildFlavor,
};

/// Suffix the toolchain gives to test bundles
pub const TEST_BUNDLE_SUFFIX: &str = "PackageTests.wasm";

/// Something that compiles a test bundle for a flavor
#[async_trait]
pub trait Builder: Send + Sync {
    /// Build the bundle and return its path, or fail with
    /// [`Error::BuildFailed`] carrying the compiler's diagnostics
    async fn build(&self, flavor: &BuildFlavor) -> Result<PathBuf>;
}

/// Builder that shells out to the configured compiler toolchain
pub struct ToolchainBuilder {
    commands: CommandBuilder,
    project_root: PathBuf,
}

impl ToolchainBuilder {
    pub fn new(toolchain: ToolchainConfig, project_root: impl Into<PathBuf>) -> Self {
        Self {
            commands: CommandBuilder::new(toolchain),
            project_root: project_root.into(),
        }
    }
}

#[async_trait]
impl Builder for ToolchainBuilder {
    async fn build(&self, flavor: &BuildFlavor) -> Result<PathBuf> {
        let command = self.commands.build_command(flavor, &self.project_root);
        let shell_cmd = command.to_shell_command();
        info!("Building: {}", shell_cmd);

        let output = command
            .to_tokio_command()
            .output()
            .await
            .map_err(|e| Error::BuildFailed(format!("failed to run `{shell_cmd}`: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let mut diagnostics = stdout.into_owned();
            diagnostics.push_str(&stderr);
            return Err(Error::BuildFailed(diagnostics));
        }

        debug!("Build output:\n{}{}", stdout, stderr);

        let output_dir = self.commands.output_dir(flavor, &self.project_root);
        find_test_bundle(&output_dir)
    }
}

/// Locate the test bundle in a toolchain output directory.
///
/// Prefers `*PackageTests.wasm`, then any `.wasm` file; ties are broken by
/// file name so the choice is stable.
pub fn find_test_bundle(output_dir: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(output_dir).map_err(|e| {
        Error::BuildFailed(format!(
            "build succeeded but {} could not be read: {e}",
            output_dir.display()
        ))
    })?;

    let mut wasm_files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "wasm"))
        .collect();
    wasm_files.sort();

    let is_test_bundle = |path: &PathBuf| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(TEST_BUNDLE_SUFFIX))
    };

    wasm_files
        .iter()
        .find(|path| is_test_bundle(path))
        .or_else(|| wasm_files.first())
        .cloned()
        .ok_or_else(|| {
            Error::BuildFailed(format!(
                "build succeeded but no test bundle was found in {}",
                output_dir.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_prefers_package_tests() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("App.wasm"), b"\0asm").unwrap();
        fs::write(temp_dir.path().join("AppPackageTests.wasm"), b"\0asm").unwrap();
        fs::write(temp_dir.path().join("AppPackageTests.js"), b"").unwrap();

        let bundle = find_test_bundle(temp_dir.path()).unwrap();
        assert_eq!(bundle, temp_dir.path().join("AppPackageTests.wasm"));
    }

    #[test]
    fn test_find_falls_back_to_any_wasm() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.wasm"), b"\0asm").unwrap();
        fs::write(temp_dir.path().join("a.wasm"), b"\0asm").unwrap();

        let bundle = find_test_bundle(temp_dir.path()).unwrap();
        assert_eq!(bundle, temp_dir.path().join("a.wasm"));
    }

    #[test]
    fn test_find_without_bundle_is_build_failure() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            find_test_bundle(temp_dir.path()),
            Err(Error::BuildFailed(_))
        ));
        assert!(matches!(
            find_test_bundle(&temp_dir.path().join("missing")),
            Err(Error::BuildFailed(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compiler_failure_surfaces_diagnostics() {
        let temp_dir = TempDir::new().unwrap();
        let toolchain = ToolchainConfig {
            program: Some("sh".to_string()),
            args: Some(vec![
                "-c".to_string(),
                "echo 'error: cannot find type Foo' >&2; exit 1".to_string(),
                "sh".to_string(),
            ]),
            ..Default::default()
        };
        let builder = ToolchainBuilder::new(toolchain, temp_dir.path());

        let err = builder.build(&BuildFlavor::default()).await.unwrap_err();
        match err {
            Error::BuildFailed(diagnostics) => {
                assert!(diagnostics.contains("error: cannot find type Foo"))
            }
            other => panic!("expected BuildFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_build_returns_bundle() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join(".build/wasm32-unknown-wasi/debug");
        let toolchain = ToolchainConfig {
            program: Some("sh".to_string()),
            args: Some(vec![
                "-c".to_string(),
                format!("mkdir -p {0} && touch {0}/DemoPackageTests.wasm", out.display()),
                "sh".to_string(),
            ]),
            ..Default::default()
        };
        let builder = ToolchainBuilder::new(toolchain, temp_dir.path());

        let bundle = builder.build(&BuildFlavor::default()).await.unwrap();
        assert_eq!(bundle, out.join("DemoPackageTests.wasm"));
    }
}
