use clap::Parser;
use wasm_runner::{EXIT_ERROR, Runner};

fn main() {
    // Initialize tracing based on RUST_LOG env var
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Usage errors share the exit code of other failures before a test ran
    let runner = match Runner::try_parse() {
        Ok(runner) => runner,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(EXIT_ERROR);
        }
    };

    match runner.command.execute() {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            std::process::exit(EXIT_ERROR);
        }
    }
}
