use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// An external program invocation: the compiler, a WASM runtime or a
/// WebDriver executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn to_shell_command(&self) -> String {
        let mut cmd = quote(&self.program);
        for arg in &self.args {
            cmd.push(' ');
            cmd.push_str(&quote(arg));
        }
        cmd
    }

    /// A tokio command with piped output that is killed when its handle is
    /// dropped
    pub fn to_tokio_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Set working directory if specified
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        cmd
    }
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(' ') {
        format!("'{arg}'")
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_shell_command_quotes_spaces() {
        let cmd = ToolCommand::new("node")
            .arg("--experimental-wasi-unstable-preview1")
            .arg("/tmp/my bundle/loader.js")
            .arg("");

        assert_eq!(
            cmd.to_shell_command(),
            "node --experimental-wasi-unstable-preview1 '/tmp/my bundle/loader.js' ''"
        );
    }

    #[test]
    fn test_builder_methods() {
        let cmd = ToolCommand::new("swift")
            .args(["build", "-c", "release"])
            .with_working_dir("/work")
            .with_env("SWIFT_DEBUG", "1");

        assert_eq!(cmd.args, vec!["build", "-c", "release"]);
        assert_eq!(cmd.working_dir(), Some(Path::new("/work")));
        assert_eq!(cmd.env, vec![("SWIFT_DEBUG".to_string(), "1".to_string())]);
    }
}
