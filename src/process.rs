use std::process::{Command, Stdio};

use tracing::debug;

use crate::errors::SweepError;

/// Captured result of one finished process.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a shell command line to completion.
pub trait CommandRunner {
    fn run(&mut self, command: &str) -> Result<CommandOutput, SweepError>;
}

/// Executes command lines with `<shell> -c`, blocking until the process exits.
/// No timeout is applied.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("/bin/bash")
    }
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, command: &str) -> Result<CommandOutput, SweepError> {
        debug!(shell = %self.shell, command, "running");

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| SweepError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        };
        debug!(code = ?result.code, "finished");
        Ok(result)
    }
}
