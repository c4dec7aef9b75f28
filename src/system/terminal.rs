// src/system/terminal.rs

use crate::{
    CancellationToken,
    core::{arguments::CommandLine, commons::PathStyle},
    system::session::ExecutionError,
};
use colored::Colorize;
use std::{
    path::Path,
    process::{Child, Command as StdCommand, Stdio},
    sync::atomic::Ordering,
    time::Duration,
};

/// A named interactive terminal. Commands sent to it run through the platform
/// shell with the user's own stdio, so prompts from the CLI stay answerable.
///
/// Terminal runs are fire-and-forget from the session's point of view: they do
/// not take the single-flight guard and their output is not captured.
#[derive(Debug, Clone)]
pub struct Terminal {
    name: String,
    command: String,
    style: PathStyle,
}

impl Terminal {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            style: PathStyle::host(),
        }
    }

    /// The full line the shell receives. The command path is inserted as configured,
    /// every argument is quoted for the shell.
    pub fn command_line(&self, line: &CommandLine) -> Result<String, ExecutionError> {
        let arguments = line
            .shell_line(self.style)
            .map_err(|e| ExecutionError::CommandParse(format!("{}: {}", line.render(), e)))?;
        Ok(format!("{} {}", self.command, arguments))
    }

    fn shell(&self) -> (&'static str, &'static str) {
        match self.style {
            PathStyle::Windows => ("cmd", "/C"),
            PathStyle::Posix => ("sh", "-c"),
        }
    }

    /// Sends `line` to the shell and returns without waiting for it.
    pub fn run_command(&self, line: &CommandLine, cwd: Option<&Path>) -> Result<Child, ExecutionError> {
        let full_line = self.command_line(line)?;
        println!("{} {}", "→".blue(), full_line.green());

        let (shell, flag) = self.shell();
        let mut command = StdCommand::new(shell);
        command
            .arg(flag)
            .arg(&full_line)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(cwd) = cwd {
            command.current_dir(dunce::simplified(cwd));
        }

        log::debug!("[{}] {}", self.name, full_line);
        command
            .spawn()
            .map_err(|e| ExecutionError::CommandFailed(full_line, e))
    }

    /// Runs `line` and blocks until it exits, killing it if `cancellation_token` is set.
    /// Returns the exit code.
    pub fn run_to_exit(
        &self,
        line: &CommandLine,
        cwd: Option<&Path>,
        cancellation_token: &CancellationToken,
    ) -> Result<Option<i32>, ExecutionError> {
        let mut child = self.run_command(line, cwd)?;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status.code()),
                Ok(None) => {
                    if cancellation_token.load(Ordering::SeqCst) {
                        log::debug!(
                            "Cancellation requested, killing terminal process (PID: {})...",
                            child.id()
                        );
                        if let Err(e) = child.kill() {
                            log::warn!("Failed to kill child process {}: {}", child.id(), e);
                        }
                        child.wait().ok();
                        return Err(ExecutionError::Interrupted);
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(ExecutionError::CommandFailed(line.render(), e));
                }
            }
        }
    }
}
