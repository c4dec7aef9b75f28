// src/cli/handlers/commons.rs

// Shared plumbing for the handlers: workspace lookup, flag parsing, the runtime
// and the two ways of running a command.

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use std::{
    env,
    path::{Path, PathBuf},
    sync::{Arc, atomic::Ordering},
};
use tokio::runtime::Runtime;

use crate::{
    CancellationToken,
    config::Config,
    core::{
        prompter::{PromptError, Prompter},
        task_execution::{TaskCompletion, TaskExecution, TaskExecutionContext},
    },
    models::{LogLevel, Platform, host_platforms, name_for_target},
    system::{
        output::ConsoleSink,
        session::{ExecutionError, ProcessSession},
        terminal::Terminal,
    },
};

/// Returns an `Interrupted` error once the user has pressed Ctrl+C.
pub fn check_for_cancellation(cancellation_token: &CancellationToken) -> Result<(), ExecutionError> {
    if cancellation_token.load(Ordering::SeqCst) {
        return Err(ExecutionError::Interrupted);
    }
    Ok(())
}

/// Maps a dismissed prompt to an interruption, so the binary exits quietly.
pub fn answered<T>(result: Result<T, PromptError>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(PromptError::Cancelled) => Err(ExecutionError::Interrupted.into()),
        Err(e) => Err(e.into()),
    }
}

/// Resolves the workspace folder: `project_dir` relative to the current directory, or
/// the current directory itself.
pub fn workspace_folder(project_dir: Option<&str>) -> Result<PathBuf> {
    let cwd = env::current_dir().context("Could not determine the current directory")?;
    let folder = match project_dir {
        Some(dir) => {
            let expanded = shellexpand::full(dir)
                .map_err(|e| anyhow!("Failed to expand path '{}': {}", dir, e))?;
            cwd.join(expanded.as_ref())
        }
        None => cwd,
    };
    if !folder.is_dir() {
        return Err(anyhow!(
            "Project directory '{}' does not exist.",
            folder.display()
        ));
    }
    Ok(match dunce::canonicalize(&folder) {
        Ok(canonical) => canonical,
        Err(_) => folder,
    })
}

pub fn parse_platform(value: Option<&str>) -> Result<Option<Platform>> {
    value.map(str::parse::<Platform>).transpose().map_err(Into::into)
}

pub fn parse_log_level(value: Option<&str>) -> Result<Option<LogLevel>> {
    value.map(str::parse::<LogLevel>).transpose().map_err(Into::into)
}

/// Uses `value` when given, otherwise asks among the platforms this host can build.
pub fn platform_or_prompt(value: Option<&str>, prompter: &dyn Prompter) -> Result<Platform> {
    if let Some(platform) = parse_platform(value)? {
        return Ok(platform);
    }
    let platforms = host_platforms();
    let labels: Vec<String> = platforms
        .iter()
        .map(|p| p.display_name().to_string())
        .collect();
    let chosen = answered(prompter.choose_one("Select a platform", &labels))?;
    platforms
        .get(chosen)
        .copied()
        .ok_or_else(|| ExecutionError::Interrupted.into())
}

/// Uses `value` when given, otherwise asks among `targets`.
pub fn target_or_prompt(
    value: Option<String>,
    targets: &[&str],
    prompter: &dyn Prompter,
) -> Result<String> {
    if let Some(target) = value {
        return Ok(target);
    }
    let labels: Vec<String> = targets.iter().map(|t| name_for_target(t)).collect();
    let chosen = answered(prompter.choose_one("Select a target", &labels))?;
    targets
        .get(chosen)
        .map(|t| (*t).to_string())
        .ok_or_else(|| ExecutionError::Interrupted.into())
}

pub fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")
}

/// Sets `cancellation_token` when Ctrl+C is pressed. Must be called inside the runtime.
pub fn watch_for_interrupt(cancellation_token: &CancellationToken) {
    let token = Arc::clone(cancellation_token);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::debug!("Ctrl+C received, cancelling...");
            token.store(true, Ordering::SeqCst);
        }
    });
}

pub fn new_session(config: &Config) -> Result<Arc<ProcessSession>> {
    let session = ProcessSession::new(&config.general.cli_command, Arc::new(ConsoleSink::new()))?;
    Ok(Arc::new(session))
}

pub fn new_terminal(config: &Config) -> Terminal {
    Terminal::new("Titanium", config.general.cli_command.clone())
}

pub fn execution_context(
    config: &Config,
    folder: &Path,
    session: &Arc<ProcessSession>,
    cancellation_token: &CancellationToken,
) -> Result<TaskExecutionContext> {
    Ok(TaskExecutionContext {
        cancellation_token: Arc::clone(cancellation_token),
        folder: folder.to_path_buf(),
        session: Arc::clone(session),
        output_dir: config.distribution_output_directory(folder)?,
        log_level: config.general.log_level,
    })
}

/// Runs a task in the terminal when `terminal` is given, otherwise in captured-output mode.
pub fn run_task(
    runtime: &Runtime,
    execution: TaskExecution,
    terminal: Option<&Terminal>,
) -> Result<TaskCompletion> {
    if let Some(terminal) = terminal {
        let line = execution.command_line()?;
        let context = execution.context();
        return match terminal.run_to_exit(&line, Some(&context.folder), &context.cancellation_token) {
            Ok(code) => Ok(TaskCompletion::Exited { code }),
            Err(ExecutionError::Interrupted) => Ok(TaskCompletion::Cancelled),
            Err(e) => Err(e.into()),
        };
    }

    let token = Arc::clone(&execution.context().cancellation_token);
    let session = Arc::clone(&execution.context().session);
    let completion = runtime.block_on(async move {
        watch_for_interrupt(&token);
        execution.execute().await
    });
    session.dispose();
    Ok(completion?)
}

/// Turns a completion into the handler's result.
pub fn finish(completion: TaskCompletion, success_message: &str) -> Result<()> {
    match completion {
        TaskCompletion::Exited { code: Some(0) } => {
            println!("\n{} {}", "✔".green(), success_message.green());
            Ok(())
        }
        TaskCompletion::Exited { code: Some(code) } => {
            Err(anyhow!("The command exited with code {}.", code))
        }
        TaskCompletion::Exited { code: None } => Err(anyhow!("The command was terminated.")),
        TaskCompletion::Cancelled => Err(ExecutionError::Interrupted.into()),
    }
}
