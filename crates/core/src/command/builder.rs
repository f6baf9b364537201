use crate::{
    command::ToolCommand,
    config::ToolchainConfig,
    types::{BuildFlavor, SanitizeVariant},
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Compiler flag enabling stack overflow detection
pub const STACK_OVERFLOW_SANITIZER_FLAG: &str = "-sanitize=stack-overflow";

/// Translates a [`BuildFlavor`] into a compiler invocation
pub struct CommandBuilder {
    toolchain: ToolchainConfig,
}

impl CommandBuilder {
    pub fn new(toolchain: ToolchainConfig) -> Self {
        Self { toolchain }
    }

    pub fn build_command(&self, flavor: &BuildFlavor, project_root: &Path) -> ToolCommand {
        let mut args = self.toolchain.args();

        args.push("-c".to_string());
        args.push(flavor.configuration().to_string());
        args.push("--triple".to_string());
        args.push(self.toolchain.triple().to_string());

        args.extend(
            self.toolchain
                .environment_args(flavor.environment)
                .iter()
                .cloned(),
        );

        let prefix = self.toolchain.flag_prefix();
        if let Some(sanitize) = flavor.sanitize {
            match sanitize {
                SanitizeVariant::StackOverflow => {
                    push_prefixed(&mut args, prefix, STACK_OVERFLOW_SANITIZER_FLAG);
                }
            }
        }

        // Flags go through in the order given, duplicates included
        for flag in &flavor.compiler_flags {
            push_prefixed(&mut args, prefix, flag);
        }

        let mut command = ToolCommand::new(self.toolchain.program())
            .args(args)
            .with_working_dir(project_root);

        if let Some(env) = &self.toolchain.env {
            for (key, value) in env {
                command = command.with_env(key.clone(), value.clone());
            }
        }

        debug!("Build command: {}", command.to_shell_command());
        command
    }

    /// Directory the toolchain writes bundles for this flavor into
    pub fn output_dir(&self, flavor: &BuildFlavor, project_root: &Path) -> PathBuf {
        project_root
            .join(self.toolchain.build_dir())
            .join(self.toolchain.triple())
            .join(flavor.configuration())
    }
}

fn push_prefixed(args: &mut Vec<String>, prefix: &str, flag: &str) {
    if !prefix.is_empty() {
        args.push(prefix.to_string());
    }
    args.push(flag.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Environment;
    use std::collections::HashMap;

    #[test]
    fn test_debug_build_command() {
        let builder = CommandBuilder::new(ToolchainConfig::default());
        let flavor = BuildFlavor::new(false, Environment::Wasmer, None, vec![]);

        let command = builder.build_command(&flavor, Path::new("/project"));
        assert_eq!(
            command.to_shell_command(),
            "swift build --build-tests -c debug --triple wasm32-unknown-wasi"
        );
        assert_eq!(command.working_dir(), Some(Path::new("/project")));
    }

    #[test]
    fn test_release_build_with_sanitizer_and_flags() {
        let builder = CommandBuilder::new(ToolchainConfig::default());
        let flavor = BuildFlavor::new(
            true,
            Environment::Node,
            Some(SanitizeVariant::StackOverflow),
            vec!["-g".to_string(), "-Osize".to_string(), "-g".to_string()],
        );

        let command = builder.build_command(&flavor, Path::new("/project"));
        assert_eq!(
            command.args,
            vec![
                "build",
                "--build-tests",
                "-c",
                "release",
                "--triple",
                "wasm32-unknown-wasi",
                "-Xswiftc",
                "-sanitize=stack-overflow",
                "-Xswiftc",
                "-g",
                "-Xswiftc",
                "-Osize",
                "-Xswiftc",
                "-g",
            ]
        );
    }

    #[test]
    fn test_environment_args_and_empty_prefix() {
        let toolchain = ToolchainConfig {
            program: Some("wasm-cc".to_string()),
            args: Some(vec!["test-bundle".to_string()]),
            flag_prefix: Some(String::new()),
            environment_args: Some(HashMap::from([(
                Environment::DefaultBrowser,
                vec!["--js-glue".to_string()],
            )])),
            ..Default::default()
        };
        let builder = CommandBuilder::new(toolchain);
        let flavor = BuildFlavor::new(
            false,
            Environment::DefaultBrowser,
            None,
            vec!["-DTESTING".to_string()],
        );

        let command = builder.build_command(&flavor, Path::new("."));
        assert_eq!(
            command.to_shell_command(),
            "wasm-cc test-bundle -c debug --triple wasm32-unknown-wasi --js-glue -DTESTING"
        );

        let wasmer = BuildFlavor::new(false, Environment::Wasmer, None, vec![]);
        assert!(!builder
            .build_command(&wasmer, Path::new("."))
            .args
            .contains(&"--js-glue".to_string()));
    }

    #[test]
    fn test_output_dir() {
        let builder = CommandBuilder::new(ToolchainConfig::default());
        let flavor = BuildFlavor::new(true, Environment::Wasmer, None, vec![]);
        assert_eq!(
            builder.output_dir(&flavor, Path::new("/project")),
            PathBuf::from("/project/.build/wasm32-unknown-wasi/release")
        );
    }
}
