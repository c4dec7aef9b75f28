// src/cli/handlers/create.rs

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;
use std::path::Path;

use super::commons;
use crate::{
    CancellationToken,
    cli::args::CreateArgs,
    config::Config,
    core::{
        arguments::{ArgumentBuilder, validate_app_id},
        prompter::{DialoguerPrompter, Prompter},
    },
    models::{CreateOptions, Platform, ProjectType, host_platforms},
};

/// The main handler for the `create` command.
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let create_args = CreateArgs::try_parse_from(&args)?;
    let config = Config::load()?;
    let workspace = commons::workspace_folder(create_args.workspace_dir.as_deref())?;
    let prompter = DialoguerPrompter;

    let options = collect_options(&create_args, &workspace, &config, &prompter)?;
    let Some(options) = options else {
        println!("{}", "Creation aborted. Nothing was changed.".yellow());
        return Ok(());
    };
    commons::check_for_cancellation(cancellation_token)?;

    let kind_label = match options.kind {
        ProjectType::App => "application",
        ProjectType::Module => "module",
    };
    let line = ArgumentBuilder::default().create(&options);

    if create_args.terminal || config.general.use_terminal_for_build {
        let terminal = commons::new_terminal(&config);
        match terminal.run_to_exit(&line, Some(&workspace), cancellation_token)? {
            Some(0) => {}
            code => bail!("Failed to create the {}, the command exited with {:?}.", kind_label, code),
        }
    } else {
        let runtime = commons::build_runtime()?;
        let session = commons::new_session(&config)?;
        let failure_message =
            format!("Failed to create the {kind_label}, please check the output.");
        runtime.block_on(session.run_with_progress(line, Some(&workspace), &failure_message))?;
    }

    println!(
        "\n{} {}",
        "✔".green(),
        format!(
            "Created {} '{}' in {}.",
            kind_label,
            options.name,
            workspace.join(&options.name).display()
        )
        .green()
    );
    Ok(())
}

/// Fills in whatever the flags left out. Returns `None` when the user declines to
/// overwrite an existing directory.
fn collect_options(
    args: &CreateArgs,
    workspace: &Path,
    config: &Config,
    prompter: &dyn Prompter,
) -> Result<Option<CreateOptions>> {
    let kind = if args.module {
        ProjectType::Module
    } else {
        ProjectType::App
    };

    let name = match &args.name {
        Some(name) => name.clone(),
        None => commons::answered(prompter.free_text("Project name", false))?,
    };
    let name = name.trim().to_string();

    let app_id = match &args.id {
        Some(id) => id.clone(),
        None => commons::answered(prompter.free_text("Application id (e.g. com.example.app)", false))?,
    };
    let app_id = app_id.trim().to_string();
    if !validate_app_id(&app_id) {
        bail!(
            "'{}' is not a valid application id. Use a reverse-domain identifier such as com.example.app.",
            app_id
        );
    }

    let platforms = if args.platforms.is_empty() {
        host_platforms()
    } else {
        args.platforms
            .iter()
            .map(|p| p.parse::<Platform>())
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut force = args.force;
    if !force && workspace.join(&name).exists() {
        let prompt = format!("'{}' already exists. Overwrite it?", name);
        match prompter.confirm(&prompt, false) {
            Ok(true) => force = true,
            Ok(false) => return Ok(None),
            Err(e) => return commons::answered(Err(e)),
        }
    }

    let log_level = commons::parse_log_level(args.log_level.as_deref())?
        .unwrap_or(config.general.log_level);

    Ok(Some(CreateOptions {
        kind,
        name,
        app_id,
        workspace_dir: workspace.to_string_lossy().into_owned(),
        platforms,
        force,
        enable_services: args.enable_services,
        log_level,
    }))
}
