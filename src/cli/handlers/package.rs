// src/cli/handlers/package.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use std::path::PathBuf;

use super::commons;
use crate::{
    CancellationToken,
    cli::args::PackageArgs,
    config::Config,
    core::{
        catalog::InfoCatalog,
        debug_resolver::{ResolveError, select_ios_signing},
        project,
        prompter::{DialoguerPrompter, PromptError, Prompter},
        task_execution::TaskExecution,
    },
    models::{
        CertificateKind, IosSigning, KeystoreInfo, Platform, ProjectType, TaskDefinition,
        TaskKind, WindowsSigning, is_distribution_target,
    },
    system::session::ExecutionError,
};

/// The main handler for the `package` command.
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let package_args = PackageArgs::try_parse_from(&args)?;
    let config = Config::load()?;
    let folder = commons::workspace_folder(package_args.project_dir.as_deref())?;
    let runtime = commons::build_runtime()?;
    let session = commons::new_session(&config)?;
    let prompter = DialoguerPrompter;

    let platform = commons::platform_or_prompt(package_args.platform.as_deref(), &prompter)?;
    let targets: Vec<&str> = platform
        .targets()
        .iter()
        .copied()
        .filter(|t| is_distribution_target(t))
        .collect();
    let target = commons::target_or_prompt(package_args.target.clone(), &targets, &prompter)?;

    let mut definition = TaskDefinition::new(TaskKind::Package, platform, folder.to_string_lossy());
    definition.target = Some(target.clone());
    definition.log_level = commons::parse_log_level(package_args.log_level.as_deref())?;
    if package_args.module {
        definition.project_type = ProjectType::Module;
    }

    match platform {
        Platform::Ios => {
            definition.ios = match (&package_args.distribution_name, &package_args.pp_uuid) {
                (Some(certificate), Some(profile)) => Some(IosSigning {
                    certificate: certificate.clone(),
                    provisioning_profile: profile.clone(),
                }),
                _ => {
                    let catalog = InfoCatalog::new(&session, &runtime);
                    let app_id = project::read_app_id(&folder).ok();
                    let signing = select_ios_signing(
                        &prompter,
                        &catalog,
                        CertificateKind::Distribution,
                        &target,
                        app_id.as_deref(),
                    )
                    .map_err(|e| match e {
                        ResolveError::Prompt(PromptError::Cancelled) => {
                            anyhow::Error::from(ExecutionError::Interrupted)
                        }
                        other => other.into(),
                    })?;
                    Some(signing)
                }
            };
        }
        Platform::Android => {
            if let Some(location) = &package_args.keystore {
                definition.android = Some(keystore_info(&package_args, location, &prompter)?);
            }
        }
        Platform::Windows => {
            definition.windows = package_args.win_cert.as_ref().map(|cert| WindowsSigning {
                certificate_location: cert.clone(),
                password: package_args.pfx_password.clone(),
                publisher_id: package_args.win_publisher_id.clone(),
            });
        }
    }

    let mut context = commons::execution_context(&config, &folder, &session, cancellation_token)?;
    if let Some(output_dir) = &package_args.output_dir {
        context.output_dir = PathBuf::from(output_dir);
    }
    let output_dir = context.output_dir.clone();

    let terminal = (package_args.terminal || config.general.use_terminal_for_build)
        .then(|| commons::new_terminal(&config));
    let completion =
        commons::run_task(&runtime, TaskExecution::new(definition, context), terminal.as_ref())?;
    commons::finish(
        completion,
        &format!("Package written to {}", output_dir.display()),
    )
}

/// Completes a keystore reference; the password is always asked for, never stored.
fn keystore_info(
    args: &PackageArgs,
    location: &str,
    prompter: &dyn Prompter,
) -> Result<KeystoreInfo> {
    let alias = match &args.alias {
        Some(alias) => alias.clone(),
        None => commons::answered(prompter.free_text("Keystore alias", false))?,
    };
    let password = commons::answered(prompter.free_text("Keystore password", true))
        .map_err(|_| anyhow!("A keystore password is required to package for Android."))?;
    Ok(KeystoreInfo {
        location: location.to_string(),
        alias,
        password: Some(password),
        key_password: args.key_password.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct TextPrompter {
        answers: RefCell<VecDeque<&'static str>>,
        secrets: RefCell<Vec<bool>>,
    }

    impl Prompter for TextPrompter {
        fn choose_one(&self, _prompt: &str, _items: &[String]) -> Result<usize, PromptError> {
            Err(PromptError::Cancelled)
        }

        fn confirm(&self, _prompt: &str, default: bool) -> Result<bool, PromptError> {
            Ok(default)
        }

        fn free_text(&self, _prompt: &str, secret: bool) -> Result<String, PromptError> {
            self.secrets.borrow_mut().push(secret);
            self.answers
                .borrow_mut()
                .pop_front()
                .map(str::to_string)
                .ok_or(PromptError::Cancelled)
        }
    }

    #[test]
    fn test_keystore_password_is_asked_as_secret() {
        let prompter = TextPrompter {
            answers: RefCell::new(VecDeque::from(["release", "s3cret"])),
            secrets: RefCell::default(),
        };
        let args = PackageArgs::default();
        let keystore = keystore_info(&args, "keys/release.jks", &prompter).unwrap();
        assert_eq!(keystore.alias, "release");
        assert_eq!(keystore.password.as_deref(), Some("s3cret"));
        assert_eq!(*prompter.secrets.borrow(), vec![false, true]);
    }

    #[test]
    fn test_missing_keystore_password_fails() {
        let prompter = TextPrompter {
            answers: RefCell::new(VecDeque::new()),
            secrets: RefCell::default(),
        };
        let args = PackageArgs {
            alias: Some("release".into()),
            ..PackageArgs::default()
        };
        let error = keystore_info(&args, "keys/release.jks", &prompter).unwrap_err();
        assert!(error.to_string().contains("keystore password is required"));
    }
}
