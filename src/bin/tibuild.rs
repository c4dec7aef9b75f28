// src/bin/tibuild.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use colored::*;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tibuild::{
    CancellationToken,
    cli::{Cli, handlers},
    system::session::ExecutionError,
};

// --- Command Definition and Registry ---

/// A command, its aliases, and its synchronous handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &CancellationToken) -> Result<()>,
}

static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "build",
        aliases: &["run"],
        handler: handlers::build::handle,
    },
    CommandDefinition {
        name: "debug",
        aliases: &[],
        handler: handlers::build::handle_debug,
    },
    CommandDefinition {
        name: "package",
        aliases: &["dist"],
        handler: handlers::package::handle,
    },
    CommandDefinition {
        name: "create",
        aliases: &["new"],
        handler: handlers::create::handle,
    },
    CommandDefinition {
        name: "clean",
        aliases: &[],
        handler: handlers::clean::handle,
    },
    CommandDefinition {
        name: "task",
        aliases: &[],
        handler: handlers::task::handle,
    },
];

fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

fn main() {
    let cancellation_token = Arc::new(AtomicBool::new(false));
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse(), cancellation_token) {
        // Ctrl+C and dismissed prompts exit quietly with the shell's interrupt code.
        if let Some(ExecutionError::Interrupted) = e.downcast_ref::<ExecutionError>() {
            std::process::exit(130);
        }

        eprintln!("\n{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli, cancellation_token: CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some(action) = cli.action else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match find_command(&action) {
        Some(command) => (command.handler)(cli.args, &cancellation_token),
        None => Err(anyhow::anyhow!(
            "Unknown command '{}'. Run 'tibuild --help' for the list of commands.",
            action
        )),
    }
}
