// src/core/task_execution.rs

use crate::{
    CancellationToken,
    constants::WORKSPACE_FOLDER_TOKEN,
    core::arguments::{ArgumentBuilder, CommandLine},
    models::{
        AndroidKeystore, BuildOptions, LogLevel, PackageOptions, PackageSigning, Platform,
        ProjectType, TaskDefinition, TaskKind,
    },
    system::session::{ExecutionError, ProcessSession, RunOutcome},
};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, atomic::Ordering},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("No target was given. App builds and packages need one.")]
    MissingTarget,
    #[error("A password for keystore '{0}' is required to package.")]
    MissingKeystorePassword(String),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Everything a task needs from its host.
#[derive(Debug, Clone)]
pub struct TaskExecutionContext {
    pub cancellation_token: CancellationToken,
    /// Workspace folder; relative project directories resolve against it.
    pub folder: PathBuf,
    pub session: Arc<ProcessSession>,
    /// Where package runs write their artifacts.
    pub output_dir: PathBuf,
    /// Used when the definition does not set a log level.
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCompletion {
    Exited { code: Option<i32> },
    Cancelled,
}

impl TaskCompletion {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited { code: Some(0) })
    }
}

/// A task definition bound to its execution context. Executing consumes it.
#[derive(Debug)]
pub struct TaskExecution {
    definition: TaskDefinition,
    context: TaskExecutionContext,
    builder: ArgumentBuilder,
}

impl TaskExecution {
    pub fn new(definition: TaskDefinition, context: TaskExecutionContext) -> Self {
        Self {
            definition,
            context,
            builder: ArgumentBuilder::default(),
        }
    }

    pub fn with_builder(mut self, builder: ArgumentBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn context(&self) -> &TaskExecutionContext {
        &self.context
    }

    /// The project directory with `${workspaceFolder}` expanded, anchored on the folder.
    pub fn project_dir(&self) -> PathBuf {
        let folder = self.context.folder.to_string_lossy();
        let expanded = self
            .definition
            .project_dir
            .replace(WORKSPACE_FOLDER_TOKEN, &folder);
        let path = Path::new(&expanded);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.context.folder.join(path)
        }
    }

    fn log_level(&self) -> LogLevel {
        self.definition.log_level.unwrap_or(self.context.log_level)
    }

    /// The CLI arguments for this task. App builds and all packages need a target;
    /// module builds run without one.
    pub fn command_line(&self) -> Result<CommandLine, TaskError> {
        let definition = &self.definition;
        let project_dir = self.project_dir().to_string_lossy().into_owned();

        match definition.kind {
            TaskKind::Build => {
                if definition.project_type == ProjectType::App && definition.target.is_none() {
                    return Err(TaskError::MissingTarget);
                }
                let mut options =
                    BuildOptions::new(definition.platform, definition.project_type, project_dir);
                options.target = definition.target.clone();
                options.device_id = definition.device_id.clone();
                options.log_level = self.log_level();
                options.ios = definition.ios.clone();
                options.debug_port = definition.debug_port;
                options.liveview = definition.liveview;
                options.skip_js_minify = definition.skip_js_minify;
                options.source_maps = definition.source_maps;
                options.deploy_type = definition.deploy_type.clone();
                options.build_only = definition.build_only;
                Ok(self.builder.build(&options))
            }
            TaskKind::Package => {
                let target = definition.target.clone().ok_or(TaskError::MissingTarget)?;
                let options = PackageOptions {
                    platform: definition.platform,
                    project_type: definition.project_type,
                    project_dir,
                    target,
                    log_level: self.log_level(),
                    output_dir: self.context.output_dir.to_string_lossy().into_owned(),
                    signing: self.package_signing()?,
                };
                Ok(self.builder.package(&options))
            }
        }
    }

    fn package_signing(&self) -> Result<Option<PackageSigning>, TaskError> {
        let definition = &self.definition;
        let signing = match definition.platform {
            Platform::Ios => definition.ios.clone().map(PackageSigning::Ios),
            Platform::Android => match &definition.android {
                Some(keystore) => {
                    let password = keystore
                        .password
                        .clone()
                        .ok_or_else(|| TaskError::MissingKeystorePassword(keystore.location.clone()))?;
                    Some(PackageSigning::Android(AndroidKeystore {
                        location: keystore.location.clone(),
                        alias: keystore.alias.clone(),
                        password,
                        key_password: keystore.key_password.clone(),
                    }))
                }
                None => None,
            },
            Platform::Windows => definition.windows.clone().map(PackageSigning::Windows),
        };
        Ok(signing)
    }

    fn is_cancelled(&self) -> bool {
        self.context.cancellation_token.load(Ordering::SeqCst)
    }

    /// Runs the task in captured-output mode and reports how it ended.
    ///
    /// A token that is already set means nothing is spawned. Setting it while the
    /// task runs kills the process and completes with [`TaskCompletion::Cancelled`].
    pub async fn execute(self) -> Result<TaskCompletion, TaskError> {
        if self.is_cancelled() {
            log::debug!("Task cancelled before it started.");
            return Ok(TaskCompletion::Cancelled);
        }

        let line = self.command_line()?;
        let run = self
            .context
            .session
            .run_captured(line, Some(&self.context.folder))?;
        log::debug!("Task started as run {}: {}", run.id(), run.command());

        let outcome = run.wait_or_cancel(&self.context.cancellation_token).await?;
        Ok(TaskCompletion::from(outcome))
    }
}

impl From<RunOutcome> for TaskCompletion {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Exited { code } => Self::Exited { code },
            RunOutcome::Killed => Self::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::commons::PathStyle,
        models::{IosSigning, KeystoreInfo},
        system::output::MemorySink,
    };
    use std::{sync::atomic::AtomicBool, time::Duration};

    fn context(command: &str) -> (TaskExecutionContext, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let session = ProcessSession::new(command, sink.clone()).unwrap();
        let context = TaskExecutionContext {
            cancellation_token: Arc::new(AtomicBool::new(false)),
            folder: PathBuf::from("/work/acme"),
            session: Arc::new(session),
            output_dir: PathBuf::from("/work/acme/dist"),
            log_level: LogLevel::Info,
        };
        (context, sink)
    }

    fn posix(definition: TaskDefinition, context: TaskExecutionContext) -> TaskExecution {
        TaskExecution::new(definition, context).with_builder(ArgumentBuilder::new(PathStyle::Posix))
    }

    #[test]
    fn test_build_line_expands_workspace_folder() {
        let (context, _) = context("appc");
        let mut definition =
            TaskDefinition::new(TaskKind::Build, Platform::Android, "${workspaceFolder}/app");
        definition.target = Some("emulator".into());
        definition.device_id = Some("Pixel_API_30".into());
        let line = posix(definition, context).command_line().unwrap();

        assert_eq!(line.value_of("--project-dir"), Some("/work/acme/app"));
        assert_eq!(line.value_of("--target"), Some("emulator"));
        assert_eq!(line.value_of("--device-id"), Some("Pixel_API_30"));
        assert_eq!(line.value_of("--log-level"), Some("info"));
    }

    #[test]
    fn test_relative_project_dir_and_log_level_override() {
        let (context, _) = context("appc");
        let mut definition = TaskDefinition::new(TaskKind::Build, Platform::Ios, "mobile");
        definition.target = Some("simulator".into());
        definition.log_level = Some(LogLevel::Error);
        let line = posix(definition, context).command_line().unwrap();
        assert_eq!(line.value_of("--project-dir"), Some("/work/acme/mobile"));
        assert_eq!(line.value_of("--log-level"), Some("error"));
    }

    #[test]
    fn test_app_build_requires_target_but_module_build_does_not() {
        let (context, _) = context("appc");
        let definition = TaskDefinition::new(TaskKind::Build, Platform::Android, "app");
        assert!(matches!(
            posix(definition.clone(), context.clone()).command_line(),
            Err(TaskError::MissingTarget)
        ));

        let mut module = definition;
        module.project_type = ProjectType::Module;
        let line = posix(module, context).command_line().unwrap();
        assert!(!line.contains("--target"));
        assert_eq!(line.value_of("--platform"), Some("android"));
    }

    #[test]
    fn test_package_line_uses_context_output_dir_and_signing() {
        let (context, _) = context("appc");
        let mut definition = TaskDefinition::new(TaskKind::Package, Platform::Ios, "/work/acme");
        definition.target = Some("dist-adhoc".into());
        definition.ios = Some(IosSigning {
            certificate: "Acme Inc (XYZ)".into(),
            provisioning_profile: "adhoc-uuid".into(),
        });
        let line = posix(definition, context).command_line().unwrap();
        assert_eq!(line.value_of("--output-dir"), Some("/work/acme/dist"));
        assert_eq!(line.value_of("--distribution-name"), Some("Acme Inc (XYZ)"));
        assert_eq!(line.value_of("--pp-uuid"), Some("adhoc-uuid"));
    }

    #[test]
    fn test_package_requires_target_and_keystore_password() {
        let (context, _) = context("appc");
        let definition = TaskDefinition::new(TaskKind::Package, Platform::Android, "/work/acme");
        assert!(matches!(
            posix(definition.clone(), context.clone()).command_line(),
            Err(TaskError::MissingTarget)
        ));

        let mut definition = definition;
        definition.target = Some("dist-playstore".into());
        definition.android = Some(KeystoreInfo {
            location: "keys/release.jks".into(),
            alias: "release".into(),
            ..KeystoreInfo::default()
        });
        assert!(matches!(
            posix(definition.clone(), context.clone()).command_line(),
            Err(TaskError::MissingKeystorePassword(_))
        ));

        if let Some(keystore) = definition.android.as_mut() {
            keystore.password = Some("s3cret".into());
        }
        let line = posix(definition, context).command_line().unwrap();
        assert_eq!(line.value_of("--store-password"), Some("s3cret"));
        assert_eq!(line.value_of("--alias"), Some("release"));
    }

    #[cfg(unix)]
    fn runnable(command: &str) -> (TaskExecutionContext, Arc<MemorySink>) {
        let (mut context, sink) = context(command);
        context.folder = std::env::temp_dir();
        (context, sink)
    }

    #[cfg(unix)]
    fn emulator_build() -> TaskDefinition {
        let mut definition = TaskDefinition::new(TaskKind::Build, Platform::Android, "app");
        definition.target = Some("emulator".into());
        definition
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_reports_exit_code() {
        let (context, sink) = runnable("sh -c 'exit 0'");
        let definition = emulator_build();
        let completion = posix(definition, context.clone()).execute().await.unwrap();
        assert!(completion.is_success());
        assert!(sink.contents().contains("\"--platform\" \"android\""));
        assert!(!context.session.is_running());

        let (context, _) = runnable("sh -c 'exit 3'");
        let definition = emulator_build();
        let completion = posix(definition, context).execute().await.unwrap();
        assert_eq!(completion, TaskCompletion::Exited { code: Some(3) });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pre_cancelled_task_spawns_nothing() {
        let (context, sink) = runnable("sh -c 'exit 0'");
        context.cancellation_token.store(true, Ordering::SeqCst);
        let definition = emulator_build();
        let completion = posix(definition, context).execute().await.unwrap();
        assert_eq!(completion, TaskCompletion::Cancelled);
        assert!(sink.contents().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_kills_running_task() {
        let (context, _) = runnable("sh -c 'exec sleep 5'");
        let token = Arc::clone(&context.cancellation_token);
        let session = Arc::clone(&context.session);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            token.store(true, Ordering::SeqCst);
        });

        let definition = emulator_build();
        let completion = posix(definition, context).execute().await.unwrap();
        assert_eq!(completion, TaskCompletion::Cancelled);
        assert!(!session.is_running());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_is_not_blocked_by_background_children() {
        let (context, _) = runnable("sh -c 'sleep 4 & exit 0'");
        let token = Arc::clone(&context.cancellation_token);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            token.store(true, Ordering::SeqCst);
        });

        let started = std::time::Instant::now();
        let completion = posix(emulator_build(), context).execute().await.unwrap();
        assert_eq!(completion, TaskCompletion::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
