//! # Argument Builder
//!
//! Turns typed build, package, create and clean options into the argument vector the
//! external CLI expects. Everything here is a pure mapping: no I/O, no state beyond the
//! path style used to normalise path arguments.
//!
//! The result is a [`CommandLine`], which keeps the raw tokens (used as argv when the
//! process is spawned directly) and can render them quoted for display or, with the
//! quoting rules of the target shell, for submission to a shell.

use crate::{
    constants::{APP_STORE_TARGET, NO_PROMPT_FLAG, WINDOWS_LOCAL_TARGET},
    core::commons::{self, PathStyle},
    models::{
        BuildOptions, CleanOptions, CreateOptions, PackageOptions, PackageSigning, Platform,
        ProjectType,
    },
};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    static ref APP_ID_REGEX: Regex =
        Regex::new(r"^[a-zA-Z_][a-zA-Z0-9]*(\.[a-zA-Z0-9]+)+$").expect("valid app id regex");
}

/// An ordered list of CLI tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandLine {
    args: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// Pushes a `--flag value` pair.
    fn option(&mut self, flag: &str, value: impl Into<String>) -> &mut Self {
        self.args.push(flag.to_string());
        self.args.push(value.into());
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn contains(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Returns the value following `flag`, if the flag is present.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        let position = self.args.iter().position(|a| a == flag)?;
        self.args.get(position + 1).map(String::as_str)
    }

    /// Appends the non-interactive flag unless it is already there.
    pub fn with_no_prompt(mut self) -> Self {
        if !self.contains(NO_PROMPT_FLAG) {
            self.args.push(NO_PROMPT_FLAG.to_string());
        }
        self
    }

    /// Every token wrapped in double quotes, so values with spaces stay a single token.
    pub fn quoted(&self) -> Vec<String> {
        self.args.iter().map(|arg| commons::wrap_value(arg)).collect()
    }

    /// The quoted tokens joined for display. Not safe to hand to `sh`, see [`Self::shell_line`].
    pub fn render(&self) -> String {
        self.quoted().join(" ")
    }

    /// The tokens quoted for the shell of `style` and joined into one line.
    pub fn shell_line(&self, style: PathStyle) -> Result<String, shlex::QuoteError> {
        let quoted = self
            .args
            .iter()
            .map(|arg| commons::quote_for_shell(arg, style))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(quoted.join(" "))
    }
}

/// Renders option records into CLI command lines.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentBuilder {
    path_style: PathStyle,
}

impl Default for ArgumentBuilder {
    fn default() -> Self {
        Self::new(PathStyle::host())
    }
}

impl ArgumentBuilder {
    pub fn new(path_style: PathStyle) -> Self {
        Self { path_style }
    }

    fn path(&self, path: &str) -> String {
        commons::normalize_path(path, self.path_style)
    }

    /// `run` command for a development build of an app or a module.
    ///
    /// Device targeting (`--target`, `--device-id`, iOS signing) is only rendered when
    /// `options.target` is set. Callers that run app builds must supply a target first;
    /// `TaskExecution::command_line` refuses an app build without one.
    pub fn build(&self, options: &BuildOptions) -> CommandLine {
        let mut line = CommandLine::new(["run"]);
        line.option("--platform", options.platform.as_str());

        // Modules are built, never deployed, so they take no device targeting.
        if options.project_type == ProjectType::App {
            if let Some(target) = &options.target {
                line.option("--target", target.as_str());

                if target != WINDOWS_LOCAL_TARGET {
                    if let Some(device_id) = &options.device_id {
                        line.option("--device-id", device_id.as_str());
                    }
                }

                if options.platform == Platform::Ios && target == "device" {
                    if let Some(ios) = &options.ios {
                        line.option("--developer-name", ios.certificate.as_str());
                        line.option("--pp-uuid", ios.provisioning_profile.as_str());
                    }
                }
            }

            if options.liveview {
                line.push("--liveview");
            }
        }

        if options.platform == Platform::Android {
            if let Some(port) = options.debug_port {
                line.option("--debug-host", format!("/localhost:{port}"));
            }
        }

        if options.skip_js_minify {
            line.push("--skip-js-minify");
        }
        if options.source_maps {
            line.push("--source-maps");
        }
        if let Some(deploy_type) = &options.deploy_type {
            line.option("--deploy-type", deploy_type.as_str());
        }
        if options.build_only {
            line.push("--build-only");
        }

        line.option("--log-level", options.log_level.as_str());
        line.option("--project-dir", self.path(&options.project_dir));
        line
    }

    /// `run` command for a distribution build.
    pub fn package(&self, options: &PackageOptions) -> CommandLine {
        let mut line = CommandLine::new(["run"]);
        line.option("--platform", options.platform.as_str());
        line.option("--target", options.target.as_str());

        // App Store builds are uploaded through Xcode; the CLI picks the location.
        if options.target != APP_STORE_TARGET {
            line.option("--output-dir", self.path(&options.output_dir));
        }

        match (options.platform, &options.signing) {
            (Platform::Ios, Some(PackageSigning::Ios(ios))) => {
                line.option("--distribution-name", ios.certificate.as_str());
                line.option("--pp-uuid", ios.provisioning_profile.as_str());
            }
            (Platform::Android, Some(PackageSigning::Android(keystore))) => {
                line.option("--keystore", self.path(&keystore.location));
                line.option("--alias", keystore.alias.as_str());
                line.option("--store-password", keystore.password.as_str());
                if let Some(key_password) = &keystore.key_password {
                    line.option("--key-password", key_password.as_str());
                }
            }
            (Platform::Windows, Some(PackageSigning::Windows(windows))) => {
                line.option("--win-cert", self.path(&windows.certificate_location));
                if let Some(password) = &windows.password {
                    line.option("--pfx-password", password.as_str());
                }
                if let Some(publisher_id) = &windows.publisher_id {
                    line.option("--win-publisher-id", publisher_id.as_str());
                }
            }
            (platform, Some(_)) => {
                log::debug!("Ignoring signing block that does not match platform '{platform}'.");
            }
            (_, None) => {}
        }

        line.option("--log-level", options.log_level.as_str());
        line.option("--project-dir", self.path(&options.project_dir));
        line
    }

    /// `new` command for an app or a module.
    pub fn create(&self, options: &CreateOptions) -> CommandLine {
        let project_type = match options.kind {
            ProjectType::App => "titanium",
            ProjectType::Module => "timodule",
        };
        let project_dir = Path::new(&options.workspace_dir).join(&options.name);
        let platforms = options
            .platforms
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let mut line = CommandLine::new(["new"]);
        line.option("--type", project_type)
            .option("--name", options.name.as_str())
            .option("--id", options.app_id.as_str())
            .option("--project-dir", self.path(&project_dir.to_string_lossy()))
            .option("--platforms", platforms)
            .push(NO_PROMPT_FLAG)
            .option("--log-level", options.log_level.as_str());

        if options.force {
            line.push("--force");
        }

        if options.kind == ProjectType::App {
            // The CLI's flag names are inverted: opting in to services means
            // turning off the "services disabled" default.
            if options.enable_services {
                line.push("--no-enable-services");
            } else {
                line.push("--no-services");
            }
        }
        line
    }

    /// `ti clean` command.
    pub fn clean(&self, options: &CleanOptions) -> CommandLine {
        let mut line = CommandLine::new(["ti", "clean"]);
        line.option("--project-dir", self.path(&options.project_dir));
        line.option("--log-level", options.log_level.as_str());
        line
    }
}

/// Checks that an application id looks like a reverse-domain identifier.
pub fn validate_app_id(app_id: &str) -> bool {
    APP_ID_REGEX.is_match(app_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AndroidKeystore, IosSigning, LogLevel, WindowsSigning,
    };

    fn builder() -> ArgumentBuilder {
        ArgumentBuilder::new(PathStyle::Posix)
    }

    fn app_build(platform: Platform, target: &str) -> BuildOptions {
        let mut options = BuildOptions::new(platform, ProjectType::App, "/work/app");
        options.target = Some(target.to_string());
        options.device_id = Some("DEVICE-1".to_string());
        options
    }

    fn ios_signing() -> IosSigning {
        IosSigning {
            certificate: "iPhone Developer: Jane Doe".to_string(),
            provisioning_profile: "1111-2222".to_string(),
        }
    }

    fn package(platform: Platform, target: &str, signing: Option<PackageSigning>) -> PackageOptions {
        PackageOptions {
            platform,
            project_type: ProjectType::App,
            project_dir: "/work/app".to_string(),
            target: target.to_string(),
            log_level: LogLevel::Info,
            output_dir: "/work/app/dist".to_string(),
            signing,
        }
    }

    fn create(enable_services: bool) -> CreateOptions {
        CreateOptions {
            kind: ProjectType::App,
            name: "MyApp".to_string(),
            app_id: "com.example.myapp".to_string(),
            workspace_dir: "/work".to_string(),
            platforms: vec![Platform::Android, Platform::Ios],
            force: false,
            enable_services,
            log_level: LogLevel::Trace,
        }
    }

    #[test]
    fn test_app_build_emits_target_and_device() {
        let line = builder().build(&app_build(Platform::Android, "emulator"));
        assert_eq!(
            line.args(),
            [
                "run",
                "--platform",
                "android",
                "--target",
                "emulator",
                "--device-id",
                "DEVICE-1",
                "--log-level",
                "trace",
                "--project-dir",
                "/work/app",
            ]
        );
    }

    #[test]
    fn test_module_build_skips_device_targeting() {
        let mut options = app_build(Platform::Android, "emulator");
        options.project_type = ProjectType::Module;
        options.liveview = true;
        let line = builder().build(&options);
        assert!(!line.contains("--target"));
        assert!(!line.contains("--device-id"));
        assert!(!line.contains("--liveview"));
        assert_eq!(line.value_of("--platform"), Some("android"));
        assert_eq!(line.value_of("--project-dir"), Some("/work/app"));
    }

    #[test]
    fn test_ios_signing_only_for_physical_device() {
        let mut on_device = app_build(Platform::Ios, "device");
        on_device.ios = Some(ios_signing());
        let line = builder().build(&on_device);
        assert_eq!(line.value_of("--developer-name"), Some("iPhone Developer: Jane Doe"));
        assert_eq!(line.value_of("--pp-uuid"), Some("1111-2222"));

        let mut on_simulator = app_build(Platform::Ios, "simulator");
        on_simulator.ios = Some(ios_signing());
        let line = builder().build(&on_simulator);
        assert!(!line.contains("--developer-name"));
        assert!(!line.contains("--pp-uuid"));
    }

    #[test]
    fn test_debug_host_only_for_android() {
        let mut android = app_build(Platform::Android, "device");
        android.debug_port = Some(9000);
        assert_eq!(
            builder().build(&android).value_of("--debug-host"),
            Some("/localhost:9000")
        );

        let mut ios = app_build(Platform::Ios, "simulator");
        ios.debug_port = Some(9000);
        assert!(!builder().build(&ios).contains("--debug-host"));

        let android_without_port = app_build(Platform::Android, "device");
        assert!(!builder().build(&android_without_port).contains("--debug-host"));
    }

    #[test]
    fn test_optional_build_flags() {
        let mut options = app_build(Platform::Android, "emulator");
        options.liveview = true;
        options.skip_js_minify = true;
        options.source_maps = true;
        options.deploy_type = Some("test".to_string());
        options.build_only = true;
        let line = builder().build(&options);
        assert!(line.contains("--liveview"));
        assert!(line.contains("--skip-js-minify"));
        assert!(line.contains("--source-maps"));
        assert!(line.contains("--build-only"));
        assert_eq!(line.value_of("--deploy-type"), Some("test"));

        let plain = builder().build(&app_build(Platform::Android, "emulator"));
        for flag in ["--liveview", "--skip-js-minify", "--source-maps", "--deploy-type", "--build-only"] {
            assert!(!plain.contains(flag), "unexpected {flag}");
        }
    }

    #[test]
    fn test_ws_local_never_gets_device_id() {
        let line = builder().build(&app_build(Platform::Windows, "ws-local"));
        assert_eq!(line.value_of("--target"), Some("ws-local"));
        assert!(!line.contains("--device-id"));
    }

    #[test]
    fn test_package_output_dir_except_app_store() {
        for target in ["dist-adhoc", "dist-playstore", "dist-winstore"] {
            let line = builder().package(&package(Platform::Ios, target, None));
            assert_eq!(line.value_of("--output-dir"), Some("/work/app/dist"), "{target}");
        }
        let line = builder().package(&package(Platform::Ios, "dist-appstore", None));
        assert!(!line.contains("--output-dir"));
    }

    #[test]
    fn test_package_signing_blocks_follow_platform() {
        let keystore = PackageSigning::Android(AndroidKeystore {
            location: "/keys/release.keystore".to_string(),
            alias: "release".to_string(),
            password: "secret".to_string(),
            key_password: Some("key-secret".to_string()),
        });
        let line = builder().package(&package(Platform::Android, "dist-playstore", Some(keystore.clone())));
        assert_eq!(line.value_of("--keystore"), Some("/keys/release.keystore"));
        assert_eq!(line.value_of("--alias"), Some("release"));
        assert_eq!(line.value_of("--store-password"), Some("secret"));
        assert_eq!(line.value_of("--key-password"), Some("key-secret"));
        assert!(!line.contains("--distribution-name"));

        let ios = PackageSigning::Ios(ios_signing());
        let line = builder().package(&package(Platform::Ios, "dist-adhoc", Some(ios)));
        assert_eq!(line.value_of("--distribution-name"), Some("iPhone Developer: Jane Doe"));
        assert!(!line.contains("--keystore"));

        let windows = PackageSigning::Windows(WindowsSigning {
            certificate_location: "/keys/cert.pfx".to_string(),
            password: Some("pfx".to_string()),
            publisher_id: None,
        });
        let line = builder().package(&package(Platform::Windows, "dist-winstore", Some(windows)));
        assert_eq!(line.value_of("--win-cert"), Some("/keys/cert.pfx"));
        assert_eq!(line.value_of("--pfx-password"), Some("pfx"));
        assert!(!line.contains("--win-publisher-id"));

        // A keystore handed to an iOS package is not rendered.
        let line = builder().package(&package(Platform::Ios, "dist-adhoc", Some(keystore)));
        assert!(!line.contains("--keystore"));
    }

    #[test]
    fn test_create_services_flags_are_inverted_and_exclusive() {
        let disabled = builder().create(&create(false));
        assert!(disabled.contains("--no-services"));
        assert!(!disabled.contains("--no-enable-services"));

        let enabled = builder().create(&create(true));
        assert!(enabled.contains("--no-enable-services"));
        assert!(!enabled.contains("--no-services"));
    }

    #[test]
    fn test_create_app_arguments() {
        let mut options = create(false);
        options.force = true;
        let line = builder().create(&options);
        assert_eq!(line.value_of("--type"), Some("titanium"));
        assert_eq!(line.value_of("--name"), Some("MyApp"));
        assert_eq!(line.value_of("--id"), Some("com.example.myapp"));
        assert_eq!(line.value_of("--project-dir"), Some("/work/MyApp"));
        assert_eq!(line.value_of("--platforms"), Some("android,ios"));
        assert!(line.contains("--no-prompt"));
        assert!(line.contains("--force"));
    }

    #[test]
    fn test_create_module_has_no_services_flags() {
        let mut options = create(true);
        options.kind = ProjectType::Module;
        let line = builder().create(&options);
        assert_eq!(line.value_of("--type"), Some("timodule"));
        assert!(!line.contains("--no-services"));
        assert!(!line.contains("--no-enable-services"));
    }

    #[test]
    fn test_clean_arguments() {
        let line = builder().clean(&CleanOptions {
            project_dir: "/work/app".to_string(),
            log_level: LogLevel::Debug,
        });
        assert_eq!(
            line.args(),
            ["ti", "clean", "--project-dir", "/work/app", "--log-level", "debug"]
        );
    }

    #[test]
    fn test_values_with_spaces_stay_single_quoted_tokens() {
        let mut options = app_build(Platform::Ios, "device");
        options.ios = Some(ios_signing());
        let quoted = builder().build(&options).quoted();
        assert!(quoted.contains(&"\"iPhone Developer: Jane Doe\"".to_string()));
        assert!(quoted.iter().all(|token| token.starts_with('"') && token.ends_with('"')));
    }

    #[test]
    fn test_shell_line_keeps_dollar_and_backticks_literal() {
        let line = CommandLine::new(["run", "--password", "pa$$word", "--name", "a`id`b c"]);
        let rendered = line.shell_line(PathStyle::Posix).unwrap();
        assert_eq!(shlex::split(&rendered).as_deref(), Some(line.args()));
        assert!(!rendered.contains("\"pa$$word\""));
    }

    #[test]
    fn test_app_build_without_target_renders_no_device_targeting() {
        let mut options = app_build(Platform::Ios, "device");
        options.target = None;
        options.ios = Some(ios_signing());
        let line = builder().build(&options);
        assert!(!line.contains("--target"));
        assert!(!line.contains("--device-id"));
        assert!(!line.contains("--developer-name"));
    }

    #[test]
    fn test_windows_paths_get_uppercase_drive() {
        let builder = ArgumentBuilder::new(PathStyle::Windows);
        let line = builder.clean(&CleanOptions {
            project_dir: "c:\\work\\app".to_string(),
            log_level: LogLevel::Trace,
        });
        assert_eq!(line.value_of("--project-dir"), Some("C:\\work\\app"));
    }

    #[test]
    fn test_with_no_prompt_is_idempotent() {
        let line = CommandLine::new(["run"]).with_no_prompt().with_no_prompt();
        assert_eq!(line.args(), ["run", "--no-prompt"]);
    }

    #[test]
    fn test_validate_app_id() {
        assert!(validate_app_id("com.example.app"));
        assert!(validate_app_id("_internal.app2"));
        assert!(!validate_app_id("app"));
        assert!(!validate_app_id("1com.example"));
        assert!(!validate_app_id("com.example-app.x"));
    }
}
