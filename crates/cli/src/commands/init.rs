use anyhow::{Context, Result};
use std::collections::HashMap;
use std::{env, path::PathBuf};
use wasm_runner_core::{
    Environment,
    config::{
        BrowserConfig, CONFIG_FILE_NAMES, Config, DEFAULT_REPORT_TIMEOUT, RuntimeConfig,
        ToolchainConfig,
    },
};

/// A config with every default spelled out, as a starting point for editing
pub fn default_config() -> Config {
    let toolchain = ToolchainConfig::default();
    let runtimes = RuntimeConfig::default();

    Config {
        environment: Some(Environment::default()),
        compiler_flags: Vec::new(),
        toolchain: ToolchainConfig {
            program: Some(toolchain.program().to_string()),
            args: Some(toolchain.args()),
            triple: Some(toolchain.triple().to_string()),
            build_dir: Some(toolchain.build_dir()),
            flag_prefix: Some(toolchain.flag_prefix().to_string()),
            environment_args: None,
            env: Some(HashMap::new()),
        },
        runtimes: RuntimeConfig {
            wasmer: Some(runtimes.wasmer().to_string()),
            node: Some(runtimes.node().to_string()),
            wasmer_args: Some(runtimes.wasmer_args()),
            node_args: Some(runtimes.node_args()),
        },
        browser: BrowserConfig {
            report_timeout_secs: Some(DEFAULT_REPORT_TIMEOUT.as_secs()),
            ..Default::default()
        },
        root: None,
    }
}

pub fn init_command(cwd: Option<&str>, force: bool) -> Result<()> {
    // Determine the project root
    let project_root = if let Some(cwd) = cwd {
        PathBuf::from(cwd)
    } else {
        env::current_dir().context("Failed to get current directory")?
    };

    let project_root = project_root
        .canonicalize()
        .context("Failed to canonicalize project root")?;

    let config_path = project_root.join(CONFIG_FILE_NAMES[0]);
    if config_path.exists() && !force {
        println!("❌ Config already exists at: {}", config_path.display());
        println!("   Use --force to overwrite");
        return Ok(());
    }

    println!("🚀 Initializing wasm-runner in: {}", project_root.display());

    default_config()
        .save_to_file(&config_path)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!("✅ Created config: {}", config_path.display());
    println!("\n📌 Next steps:");
    println!("   Set \"environment\" to wasmer, node or defaultBrowser");
    println!("   Run `wasm-runner test` from anywhere inside the project");

    Ok(())
}
