// src/cli/handlers/build.rs

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::path::Path;

use super::commons;
use crate::{
    CancellationToken,
    cli::args::{BuildArgs, DebugArgs},
    config::Config,
    constants::DEFAULT_DEBUG_PORT,
    core::{
        catalog::InfoCatalog,
        debug_resolver::{DebugConfigurationResolver, ResolverEnvironment},
        project,
        prompter::DialoguerPrompter,
        state_store::FileStateStore,
        task_execution::TaskExecution,
    },
    models::{
        DebugConfiguration, ProjectType, RequestKind, TaskDefinition, TaskKind, host_platforms,
    },
};

/// The main handler for the `build` command.
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let build_args = BuildArgs::try_parse_from(&args)?;
    run(build_args, None, RequestKind::Launch, cancellation_token)
}

/// The main handler for the `debug` command: a build with the debugger port enabled.
pub fn handle_debug(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let debug_args = DebugArgs::try_parse_from(&args)?;
    let request = if debug_args.attach {
        RequestKind::Attach
    } else {
        RequestKind::Launch
    };
    let port = debug_args.port.unwrap_or(DEFAULT_DEBUG_PORT);
    run(debug_args.build, Some(port), request, cancellation_token)
}

/// Seeds a debug configuration with everything given on the command line.
fn prefill(args: &BuildArgs, folder: &Path, port: Option<u16>, request: RequestKind) -> Result<DebugConfiguration> {
    let mut config = DebugConfiguration::new(request);
    config.project_dir = Some(folder.to_path_buf());
    config.platform = commons::parse_platform(args.platform.as_deref())?;
    config.log_level = commons::parse_log_level(args.log_level.as_deref())?;
    config.target = args.target.clone();
    config.device_id = args.device_id.clone();
    config.device_name = args.device_name.clone();
    config.ios_certificate = args.ios_certificate.clone();
    config.ios_provisioning_profile = args.ios_provisioning_profile.clone();
    if let Some(port) = port {
        config.port = Some(port);
        config.debug_port = Some(port);
    }
    Ok(config)
}

fn to_definition(args: &BuildArgs, resolved: &DebugConfiguration, debugging: bool) -> Result<TaskDefinition> {
    let (Some(platform), true) = (resolved.platform, resolved.is_resolvable()) else {
        bail!("The build needs a platform and a target, but the configuration left one unresolved.");
    };
    let project_dir = resolved
        .project_dir
        .as_ref()
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut definition = TaskDefinition::new(TaskKind::Build, platform, project_dir);
    definition.target = resolved.target.clone();
    definition.device_id = resolved.device_id.clone();
    definition.log_level = resolved.log_level;
    definition.ios = resolved.ios_signing();
    definition.build_only = args.build_only;
    definition.liveview = args.liveview;
    definition.skip_js_minify = args.skip_js_minify;
    definition.source_maps = args.source_maps;
    definition.deploy_type = args.deploy_type.clone();
    if debugging {
        definition.debug_port = resolved.debug_port;
    }
    Ok(definition)
}

fn run(
    args: BuildArgs,
    port: Option<u16>,
    request: RequestKind,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    let config = Config::load()?;
    let folder = commons::workspace_folder(args.project_dir.as_deref())?;
    let runtime = commons::build_runtime()?;
    let session = commons::new_session(&config)?;
    let prompter = DialoguerPrompter;

    // Modules are never deployed, so there is nothing to resolve beyond the platform.
    if args.module {
        let platform = commons::platform_or_prompt(args.platform.as_deref(), &prompter)?;
        let mut definition =
            TaskDefinition::new(TaskKind::Build, platform, folder.to_string_lossy());
        definition.project_type = ProjectType::Module;
        definition.log_level = commons::parse_log_level(args.log_level.as_deref())?;
        definition.build_only = true;
        let context = commons::execution_context(&config, &folder, &session, cancellation_token)?;
        let terminal = (args.terminal || config.general.use_terminal_for_build)
            .then(|| commons::new_terminal(&config));
        let completion =
            commons::run_task(&runtime, TaskExecution::new(definition, context), terminal.as_ref())?;
        return commons::finish(completion, "Module built.");
    }

    let store = FileStateStore::for_project(&folder);
    let catalog = InfoCatalog::new(&session, &runtime);
    let environment = ResolverEnvironment {
        workspace_folder: folder.clone(),
        log_level: config.general.log_level,
        platforms: host_platforms(),
        app_id: match project::read_app_id(&folder) {
            Ok(id) => Some(id),
            Err(e) => {
                log::debug!("Provisioning profiles will not be filtered: {}", e);
                None
            }
        },
    };
    let resolver = DebugConfigurationResolver::new(&prompter, &catalog, &store, environment);
    let resolved = resolver.resolve(prefill(&args, &folder, port, request)?)?;

    if request == RequestKind::Attach {
        println!(
            "{}",
            serde_json::to_string_pretty(&resolved).context("Failed to render the configuration")?
        );
        return Ok(());
    }

    let definition = to_definition(&args, &resolved, port.is_some())?;
    let context = commons::execution_context(&config, &folder, &session, cancellation_token)?;
    let execution = TaskExecution::new(definition, context);
    let use_terminal = args.terminal || config.general.use_terminal_for_build;
    let terminal = use_terminal.then(|| commons::new_terminal(&config));

    let completion = commons::run_task(&runtime, execution, terminal.as_ref())?;
    if completion.is_success() {
        match resolver.remember(&resolved) {
            Ok(true) => log::debug!("Remembered this session for the next run."),
            Ok(false) => {}
            Err(e) => println!(
                "{}",
                format!("Warning: could not remember this session: {e}").yellow()
            ),
        }
    }
    commons::finish(completion, "Build finished.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;
    use std::path::PathBuf;

    #[test]
    fn test_prefill_copies_flags_and_port() {
        let args = BuildArgs::try_parse_from([
            "--platform",
            "android",
            "--target",
            "emulator",
            "--device-id",
            "Pixel_API_30",
        ])
        .unwrap();
        let config = prefill(&args, Path::new("/work/acme"), Some(9229), RequestKind::Launch).unwrap();
        assert_eq!(config.platform, Some(Platform::Android));
        assert_eq!(config.target.as_deref(), Some("emulator"));
        assert_eq!(config.port, Some(9229));
        assert_eq!(config.debug_port, Some(9229));
        assert_eq!(config.project_dir, Some(PathBuf::from("/work/acme")));
    }

    #[test]
    fn test_debug_port_only_reaches_debug_builds() {
        let args = BuildArgs::default();
        let mut resolved = DebugConfiguration::new(RequestKind::Launch);
        resolved.platform = Some(Platform::Android);
        resolved.target = Some("emulator".into());
        resolved.debug_port = Some(9000);

        assert_eq!(to_definition(&args, &resolved, false).unwrap().debug_port, None);
        assert_eq!(to_definition(&args, &resolved, true).unwrap().debug_port, Some(9000));
    }

    #[test]
    fn test_unresolved_configuration_is_not_built() {
        let args = BuildArgs::default();
        let mut resolved = DebugConfiguration::new(RequestKind::Launch);
        assert!(to_definition(&args, &resolved, false).is_err());

        resolved.platform = Some(Platform::Ios);
        let error = to_definition(&args, &resolved, false).unwrap_err();
        assert!(error.to_string().contains("a platform and a target"));

        resolved.target = Some("simulator".into());
        let definition = to_definition(&args, &resolved, false).unwrap();
        assert_eq!(definition.target.as_deref(), Some("simulator"));
    }
}
