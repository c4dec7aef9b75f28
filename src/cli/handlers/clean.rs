// src/cli/handlers/clean.rs

use anyhow::Result;
use clap::Parser;

use super::commons;
use crate::{
    CancellationToken,
    cli::args::CleanArgs,
    config::Config,
    core::{arguments::ArgumentBuilder, task_execution::TaskCompletion},
    models::CleanOptions,
    system::session::ExecutionError,
};

/// The main handler for the `clean` command.
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let clean_args = CleanArgs::try_parse_from(&args)?;
    let config = Config::load()?;
    let folder = commons::workspace_folder(clean_args.project_dir.as_deref())?;
    let options = CleanOptions {
        project_dir: folder.to_string_lossy().into_owned(),
        log_level: commons::parse_log_level(clean_args.log_level.as_deref())?
            .unwrap_or(config.general.log_level),
    };
    let line = ArgumentBuilder::default().clean(&options);

    let completion = if clean_args.terminal || config.general.use_terminal_for_build {
        let terminal = commons::new_terminal(&config);
        match terminal.run_to_exit(&line, Some(&folder), cancellation_token) {
            Ok(code) => TaskCompletion::Exited { code },
            Err(ExecutionError::Interrupted) => TaskCompletion::Cancelled,
            Err(e) => return Err(e.into()),
        }
    } else {
        let runtime = commons::build_runtime()?;
        let session = commons::new_session(&config)?;
        let outcome = runtime.block_on(async {
            commons::watch_for_interrupt(cancellation_token);
            let run = session.run_captured(line, Some(&folder))?;
            run.wait_or_cancel(cancellation_token).await
        });
        session.dispose();
        TaskCompletion::from(outcome?)
    };

    commons::finish(completion, "Project cleaned.")
}
