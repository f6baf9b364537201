use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use wasm_runner_core::{BuildFlavor, Config, Environment, SanitizeVariant};

use crate::commands::{TestOptions, init_command, test_command};

/// Exit code for runs that stopped before producing a verdict
pub const EXIT_ERROR: i32 = 3;

#[derive(Parser, Debug)]
#[command(name = "wasm-runner")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    RUST_LOG=debug          Enable debug logging\n    WEBDRIVER_REMOTE_URL    Use this WebDriver endpoint instead of a local driver\n\nEXIT CODES:\n    0 passed, 1 tests failed, 2 crashed, 3 error before any test ran"
)]
pub struct Runner {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options that decide how the test bundle is built
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct FlavorArgs {
    /// Where to run the tests: wasmer, node or defaultBrowser
    #[arg(short, long)]
    pub environment: Option<String>,

    /// Build in release configuration
    #[arg(long)]
    pub release: bool,

    /// Enable a sanitizer (stackOverflow)
    #[arg(long)]
    pub sanitize: Option<String>,

    /// Pass a flag to the compiler; repeatable, order is kept
    #[arg(
        short = 'X',
        long = "compiler-flag",
        value_name = "FLAG",
        allow_hyphen_values = true
    )]
    pub compiler_flags: Vec<String>,
}

impl FlavorArgs {
    /// Resolve against the config file: command-line values win, config
    /// compiler flags come before command-line ones
    pub fn into_flavor(self, config: &Config) -> wasm_runner_core::Result<BuildFlavor> {
        let environment = match self.environment {
            Some(name) => name.parse::<Environment>()?,
            None => config.environment.unwrap_or_default(),
        };
        let sanitize = self
            .sanitize
            .as_deref()
            .map(str::parse::<SanitizeVariant>)
            .transpose()?;

        let mut compiler_flags = config.compiler_flags.clone();
        compiler_flags.extend(self.compiler_flags);

        Ok(BuildFlavor::new(
            self.release,
            environment,
            sanitize,
            compiler_flags,
        ))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the test bundle and run it in the selected environment
    #[command(visible_alias = "t")]
    Test {
        #[command(flatten)]
        flavor: FlavorArgs,

        /// Run this bundle instead of building one
        #[arg(long, value_name = "PATH")]
        prebuilt_test_bundle_path: Option<PathBuf>,

        /// Ask the browser for a headless session
        #[arg(long)]
        headless: bool,

        /// Port for the browser harness server (default: any free port)
        #[arg(long)]
        port: Option<u16>,

        /// Config file to use instead of searching from the current directory
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Print the verdict as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Write a default .wasm-runner.json
    Init {
        /// Specify the current working directory
        #[arg(short, long)]
        cwd: Option<String>,

        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

impl Commands {
    /// Execute the command and return the process exit code
    pub fn execute(self) -> Result<i32> {
        match self {
            Commands::Test {
                flavor,
                prebuilt_test_bundle_path,
                headless,
                port,
                config,
                json,
            } => test_command(
                flavor,
                TestOptions {
                    prebuilt_test_bundle_path,
                    headless,
                    port,
                    config,
                    json,
                },
            ),
            Commands::Init { cwd, force } => {
                init_command(cwd.as_deref(), force)?;
                Ok(0)
            }
        }
    }
}
