// src/cli/handlers/task.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;

use super::commons;
use crate::{
    CancellationToken,
    cli::args::TaskArgs,
    config::Config,
    core::{
        prompter::{DialoguerPrompter, Prompter},
        task_execution::TaskExecution,
        task_file::{self, TaskDescriptor},
    },
    models::{Platform, TaskDefinition, TaskKind},
};

/// The main handler for the `task` command: runs a Titanium task from the project's tasks file.
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let task_args = TaskArgs::try_parse_from(&args)?;
    let config = Config::load()?;
    let folder = commons::workspace_folder(task_args.project_dir.as_deref())?;
    let tasks = task_file::load_tasks(&folder)?;

    if task_args.list {
        print_tasks(&tasks);
        return Ok(());
    }
    if tasks.is_empty() {
        return Err(anyhow!(
            "No Titanium tasks found in '{}'.",
            folder.join(crate::constants::TASKS_FILE).display()
        ));
    }

    let prompter = DialoguerPrompter;
    let descriptor = match &task_args.label {
        Some(label) => task_file::find_task(&tasks, label)?,
        None => choose_task(&tasks, &prompter)?,
    };
    let definition = definition_for(descriptor, task_args.store_password.as_deref(), &prompter)?;

    let runtime = commons::build_runtime()?;
    let session = commons::new_session(&config)?;
    let context = commons::execution_context(&config, &folder, &session, cancellation_token)?;
    let terminal = (task_args.terminal || config.general.use_terminal_for_build)
        .then(|| commons::new_terminal(&config));

    log::info!("Running task '{}'", descriptor.label);
    let completion =
        commons::run_task(&runtime, TaskExecution::new(definition, context), terminal.as_ref())?;
    commons::finish(completion, &format!("Task '{}' finished.", descriptor.label))
}

fn print_tasks(tasks: &[TaskDescriptor]) {
    if tasks.is_empty() {
        println!("{}", "No Titanium tasks defined.".yellow());
        return;
    }
    println!("{}", "Titanium tasks:".bold());
    for task in tasks {
        let build = &task.titanium_build;
        println!(
            "  {} {} {}",
            "→".blue(),
            task.label.cyan(),
            format!(
                "({} {})",
                build.platform.display_name(),
                build.target.as_deref().unwrap_or("-")
            )
            .dimmed()
        );
    }
}

fn choose_task<'a>(
    tasks: &'a [TaskDescriptor],
    prompter: &dyn Prompter,
) -> Result<&'a TaskDescriptor> {
    let labels: Vec<String> = tasks.iter().map(|t| t.label.clone()).collect();
    let chosen = commons::answered(prompter.choose_one("Select a task", &labels))?;
    tasks
        .get(chosen)
        .ok_or_else(|| anyhow!("No task at position {}", chosen))
}

/// Converts a descriptor, asking for the keystore password of Android package tasks.
fn definition_for(
    descriptor: &TaskDescriptor,
    store_password: Option<&str>,
    prompter: &dyn Prompter,
) -> Result<TaskDefinition> {
    let mut definition = descriptor
        .to_definition()
        .ok_or_else(|| anyhow!("'{}' is not a Titanium task.", descriptor.label))?;

    let needs_password = definition.kind == TaskKind::Package
        && definition.platform == Platform::Android
        && definition
            .android
            .as_ref()
            .is_some_and(|keystore| keystore.password.is_none());
    if needs_password {
        let password = match store_password {
            Some(password) => password.to_string(),
            None => commons::answered(prompter.free_text("Keystore password", true))?,
        };
        if let Some(keystore) = definition.android.as_mut() {
            keystore.password = Some(password);
        }
    }
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompter::PromptError;
    use std::cell::Cell;

    const TASKS: &str = r#"{
        "version": "2.0.0",
        "tasks": [
            {
                "label": "Android Emulator",
                "type": "titanium-build",
                "titaniumBuild": {
                    "platform": "android",
                    "projectDir": "${workspaceFolder}",
                    "target": "emulator"
                }
            },
            {
                "label": "Play Store",
                "type": "titanium-package",
                "titaniumBuild": {
                    "platform": "android",
                    "projectDir": "${workspaceFolder}",
                    "target": "dist-playstore",
                    "android": { "keystore": { "alias": "release", "location": "keys/release.jks" } }
                }
            }
        ]
    }"#;

    struct PasswordPrompter {
        asked: Cell<u32>,
    }

    impl Prompter for PasswordPrompter {
        fn choose_one(&self, _prompt: &str, items: &[String]) -> Result<usize, PromptError> {
            Ok(items.len() - 1)
        }

        fn confirm(&self, _prompt: &str, default: bool) -> Result<bool, PromptError> {
            Ok(default)
        }

        fn free_text(&self, _prompt: &str, secret: bool) -> Result<String, PromptError> {
            assert!(secret);
            self.asked.set(self.asked.get() + 1);
            Ok("typed".to_string())
        }
    }

    #[test]
    fn test_package_task_asks_for_password() {
        let tasks = task_file::parse_tasks(TASKS).unwrap();
        let prompter = PasswordPrompter { asked: Cell::new(0) };
        let task = choose_task(&tasks, &prompter).unwrap();
        assert_eq!(task.label, "Play Store");

        let definition = definition_for(task, None, &prompter).unwrap();
        assert_eq!(prompter.asked.get(), 1);
        assert_eq!(
            definition.android.and_then(|k| k.password).as_deref(),
            Some("typed")
        );
    }

    #[test]
    fn test_store_password_flag_skips_prompt() {
        let tasks = task_file::parse_tasks(TASKS).unwrap();
        let prompter = PasswordPrompter { asked: Cell::new(0) };
        let task = task_file::find_task(&tasks, "Play Store").unwrap();
        let definition = definition_for(task, Some("flag"), &prompter).unwrap();
        assert_eq!(prompter.asked.get(), 0);
        assert_eq!(
            definition.android.and_then(|k| k.password).as_deref(),
            Some("flag")
        );
    }

    #[test]
    fn test_build_task_needs_no_password() {
        let tasks = task_file::parse_tasks(TASKS).unwrap();
        let prompter = PasswordPrompter { asked: Cell::new(0) };
        let task = task_file::find_task(&tasks, "Android Emulator").unwrap();
        let definition = definition_for(task, None, &prompter).unwrap();
        assert_eq!(definition.kind, TaskKind::Build);
        assert_eq!(prompter.asked.get(), 0);
    }
}
