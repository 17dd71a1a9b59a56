//! External command invocation for deployers.

use std::fmt;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::updater::{UpdateError, UpdateResult};

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a command spec.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Run a user-supplied command line through the platform shell.
    pub fn shell(line: impl Into<String>) -> Self {
        let line = line.into();
        if cfg!(windows) {
            Self::new("cmd", ["/C".to_string(), line])
        } else {
            Self::new("sh", ["-c".to_string(), line])
        }
    }

    /// Run to completion; a non-zero exit is a deploy failure.
    pub fn run(&self) -> UpdateResult<()> {
        debug!(command = %self, "Running deploy command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| UpdateError::DeployFailed(format!("failed to run {}: {}", self, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UpdateError::DeployFailed(format!(
                "{} exited with {}: {}",
                self,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Start without waiting for the process to exit.
    pub fn spawn_detached(&self) -> UpdateResult<()> {
        debug!(command = %self, "Starting deploy command in background");
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| UpdateError::DeployFailed(format!("failed to start {}: {}", self, e)))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let cmd = CommandSpec::new("fcitx5-remote", ["-r"]);
        assert_eq!(cmd.to_string(), "fcitx5-remote -r");
    }

    #[test]
    fn test_shell_success_and_failure() {
        assert!(CommandSpec::shell("true").run().is_ok());

        let err = CommandSpec::shell("echo nope >&2; exit 4").run().unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("deployer:"));
        assert!(msg.contains("nope"));
    }

    #[test]
    fn test_missing_program() {
        let err = CommandSpec::new("/nonexistent/rime-deployer", Vec::<String>::new())
            .run()
            .unwrap_err();
        assert!(matches!(err, UpdateError::DeployFailed(_)));
    }
}
