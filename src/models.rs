// src/models.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown platform '{0}'. Expected one of: android, ios, windows.")]
    UnknownPlatform(String),
    #[error("Unknown log level '{0}'. Expected one of: trace, debug, info, warn, error.")]
    UnknownLogLevel(String),
    #[error("Unknown project type '{0}'. Expected 'app' or 'module'.")]
    UnknownProjectType(String),
}

// --- PLATFORMS & TARGETS ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Windows,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Windows => "windows",
        }
    }

    /// Pretty name shown in prompts and labels.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Android => "Android",
            Self::Ios => "iOS",
            Self::Windows => "Windows",
        }
    }

    /// Every target the CLI accepts for this platform, distribution targets included.
    pub fn targets(self) -> &'static [&'static str] {
        match self {
            Self::Android => &["emulator", "device", "dist-playstore"],
            Self::Ios => &["simulator", "device", "dist-adhoc", "dist-appstore"],
            Self::Windows => &[
                "dist-phonestore",
                "dist-winstore",
                "wp-emulator",
                "wp-device",
                "ws-local",
            ],
        }
    }

    /// Targets that can be run or debugged, i.e. everything except `dist-*`.
    pub fn run_targets(self) -> Vec<&'static str> {
        self.targets()
            .iter()
            .copied()
            .filter(|target| !is_distribution_target(target))
            .collect()
    }
}

impl FromStr for Platform {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "android" => Ok(Self::Android),
            // Older tooling reports the device family instead of the platform.
            "ios" | "iphone" | "ipad" => Ok(Self::Ios),
            "windows" => Ok(Self::Windows),
            _ => Err(ModelError::UnknownPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platforms that can be built from the current host OS.
pub fn host_platforms() -> Vec<Platform> {
    if cfg!(target_os = "macos") {
        vec![Platform::Ios, Platform::Android]
    } else if cfg!(target_os = "windows") {
        vec![Platform::Android, Platform::Windows]
    } else {
        vec![Platform::Android]
    }
}

pub fn is_distribution_target(target: &str) -> bool {
    target.starts_with("dist")
}

/// Returns the label used for a target in the UI.
pub fn name_for_target(target: &str) -> String {
    let lowered = target.to_lowercase();
    match lowered.as_str() {
        "device" | "emulator" | "simulator" => {
            let mut chars = lowered.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        "dist-adhoc" => "Ad-Hoc".to_string(),
        "dist-appstore" => "App Store".to_string(),
        "dist-playstore" => "Play Store".to_string(),
        _ => target.to_string(),
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    #[default]
    App,
    Module,
}

impl FromStr for ProjectType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "app" => Ok(Self::App),
            "module" => Ok(Self::Module),
            _ => Err(ModelError::UnknownProjectType(s.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ModelError::UnknownLogLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- SIGNING RECORDS ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IosSigning {
    /// Certificate display name, e.g. `iPhone Developer: Jane Doe (ABCDE12345)`.
    pub certificate: String,
    /// Provisioning profile UUID.
    pub provisioning_profile: String,
}

/// Fully specified keystore, as required by an Android package run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidKeystore {
    pub location: String,
    pub alias: String,
    pub password: String,
    pub key_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowsSigning {
    pub certificate_location: String,
    pub password: Option<String>,
    pub publisher_id: Option<String>,
}

/// Platform-specific signing block of a package run. The variant must match
/// the package platform; a mismatched block is ignored by the argument builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSigning {
    Ios(IosSigning),
    Android(AndroidKeystore),
    Windows(WindowsSigning),
}

// --- ARGUMENT OPTION RECORDS ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub platform: Platform,
    pub project_type: ProjectType,
    pub project_dir: String,
    pub target: Option<String>,
    pub device_id: Option<String>,
    pub log_level: LogLevel,
    pub ios: Option<IosSigning>,
    pub debug_port: Option<u16>,
    pub liveview: bool,
    pub skip_js_minify: bool,
    pub source_maps: bool,
    pub deploy_type: Option<String>,
    pub build_only: bool,
}

impl BuildOptions {
    pub fn new(platform: Platform, project_type: ProjectType, project_dir: impl Into<String>) -> Self {
        Self {
            platform,
            project_type,
            project_dir: project_dir.into(),
            target: None,
            device_id: None,
            log_level: LogLevel::default(),
            ios: None,
            debug_port: None,
            liveview: false,
            skip_js_minify: false,
            source_maps: false,
            deploy_type: None,
            build_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOptions {
    pub platform: Platform,
    pub project_type: ProjectType,
    pub project_dir: String,
    pub target: String,
    pub log_level: LogLevel,
    pub output_dir: String,
    pub signing: Option<PackageSigning>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    pub kind: ProjectType,
    pub name: String,
    pub app_id: String,
    /// Parent directory; the project is created in `<workspace_dir>/<name>`.
    pub workspace_dir: String,
    pub platforms: Vec<Platform>,
    pub force: bool,
    pub enable_services: bool,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanOptions {
    pub project_dir: String,
    pub log_level: LogLevel,
}

// --- DEBUG CONFIGURATION ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    #[default]
    Launch,
    Attach,
}

/// A launch/attach configuration, filled in field by field by the resolver.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DebugConfiguration {
    pub request: RequestKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(rename = "iOSCertificate", skip_serializing_if = "Option::is_none")]
    pub ios_certificate: Option<String>,
    #[serde(rename = "iOSProvisioningProfile", skip_serializing_if = "Option::is_none")]
    pub ios_provisioning_profile: Option<String>,
}

impl DebugConfiguration {
    pub fn new(request: RequestKind) -> Self {
        Self {
            request,
            ..Default::default()
        }
    }

    /// A configuration can be rendered to a command line once platform and target are known.
    pub fn is_resolvable(&self) -> bool {
        self.platform.is_some() && self.target.is_some()
    }

    /// Whether this configuration needs iOS code signing to run.
    pub fn needs_ios_signing(&self) -> bool {
        self.platform == Some(Platform::Ios)
            && self.target.as_deref() == Some("device")
            && self.request == RequestKind::Launch
    }

    pub fn ios_signing(&self) -> Option<IosSigning> {
        match (&self.ios_certificate, &self.ios_provisioning_profile) {
            (Some(certificate), Some(profile)) => Some(IosSigning {
                certificate: certificate.clone(),
                provisioning_profile: profile.clone(),
            }),
            _ => None,
        }
    }
}

/// The last configuration that ran for a platform, offered as a shortcut next time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LastDebugState {
    pub target: String,
    pub device_id: String,
    pub device_name: String,
    #[serde(rename = "iOSCertificate", default, skip_serializing_if = "Option::is_none")]
    pub ios_certificate: Option<String>,
    #[serde(
        rename = "iOSProvisioningProfile",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ios_provisioning_profile: Option<String>,
}

impl LastDebugState {
    /// Captures the device selection of a configuration. Returns `None` while
    /// target or device are still missing.
    pub fn from_configuration(config: &DebugConfiguration) -> Option<Self> {
        Some(Self {
            target: config.target.clone()?,
            device_id: config.device_id.clone()?,
            device_name: config
                .device_name
                .clone()
                .unwrap_or_else(|| config.device_id.clone().unwrap_or_default()),
            ios_certificate: config.ios_certificate.clone(),
            ios_provisioning_profile: config.ios_provisioning_profile.clone(),
        })
    }

    pub fn label(&self) -> String {
        format!("Last debug session ({} - {})", self.target, self.device_name)
    }

    /// Copies the whole selection into `config` in one step.
    pub fn apply_to(&self, config: &mut DebugConfiguration) {
        config.target = Some(self.target.clone());
        config.device_id = Some(self.device_id.clone());
        config.device_name = Some(self.device_name.clone());
        config.ios_certificate = self.ios_certificate.clone();
        config.ios_provisioning_profile = self.ios_provisioning_profile.clone();
    }
}

// --- CATALOG ENTRIES ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// Short name passed to `--developer-name` / `--distribution-name`.
    pub name: String,
    pub full_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningProfile {
    pub uuid: String,
    pub name: String,
    pub app_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateKind {
    Developer,
    Distribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Development,
    AdHoc,
    Distribution,
}

impl ProfileKind {
    pub fn for_target(target: &str) -> Self {
        match target {
            "dist-adhoc" => Self::AdHoc,
            "dist-appstore" => Self::Distribution,
            _ => Self::Development,
        }
    }
}

// --- TASKS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Build,
    Package,
}

/// Keystore reference as stored in a task; passwords are usually supplied at run time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeystoreInfo {
    pub location: String,
    pub alias: String,
    pub password: Option<String>,
    pub key_password: Option<String>,
}

/// A declarative build or package run, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub kind: TaskKind,
    pub platform: Platform,
    pub project_type: ProjectType,
    pub project_dir: String,
    pub target: Option<String>,
    pub device_id: Option<String>,
    pub build_only: bool,
    pub log_level: Option<LogLevel>,
    pub ios: Option<IosSigning>,
    pub android: Option<KeystoreInfo>,
    pub windows: Option<WindowsSigning>,
    pub debug_port: Option<u16>,
    pub liveview: bool,
    pub skip_js_minify: bool,
    pub source_maps: bool,
    pub deploy_type: Option<String>,
}

impl TaskDefinition {
    pub fn new(kind: TaskKind, platform: Platform, project_dir: impl Into<String>) -> Self {
        Self {
            kind,
            platform,
            project_type: ProjectType::App,
            project_dir: project_dir.into(),
            target: None,
            device_id: None,
            build_only: false,
            log_level: None,
            ios: None,
            android: None,
            windows: None,
            debug_port: None,
            liveview: false,
            skip_js_minify: false,
            source_maps: false,
            deploy_type: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parsing_normalises_device_families() {
        assert_eq!("iphone".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!("iPad".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!("Android".parse::<Platform>().unwrap(), Platform::Android);
        assert!("blackberry".parse::<Platform>().is_err());
    }

    #[test]
    fn test_run_targets_exclude_distribution() {
        assert_eq!(Platform::Ios.run_targets(), vec!["simulator", "device"]);
        assert_eq!(Platform::Android.run_targets(), vec!["emulator", "device"]);
        assert_eq!(
            Platform::Windows.run_targets(),
            vec!["wp-emulator", "wp-device", "ws-local"]
        );
    }

    #[test]
    fn test_name_for_target() {
        assert_eq!(name_for_target("device"), "Device");
        assert_eq!(name_for_target("simulator"), "Simulator");
        assert_eq!(name_for_target("dist-appstore"), "App Store");
        assert_eq!(name_for_target("dist-playstore"), "Play Store");
        assert_eq!(name_for_target("wp-device"), "wp-device");
    }

    #[test]
    fn test_ios_signing_only_for_device_launch() {
        let mut config = DebugConfiguration::new(RequestKind::Launch);
        config.platform = Some(Platform::Ios);
        config.target = Some("device".to_string());
        assert!(config.needs_ios_signing());

        config.request = RequestKind::Attach;
        assert!(!config.needs_ios_signing());

        config.request = RequestKind::Launch;
        config.target = Some("simulator".to_string());
        assert!(!config.needs_ios_signing());
    }

    #[test]
    fn test_debug_configuration_uses_host_field_names() {
        let mut config = DebugConfiguration::new(RequestKind::Launch);
        config.platform = Some(Platform::Ios);
        config.ios_certificate = Some("Jane".to_string());
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["request"], "launch");
        assert_eq!(json["platform"], "ios");
        assert_eq!(json["iOSCertificate"], "Jane");
        assert!(json.get("target").is_none());
    }

    #[test]
    fn test_last_state_requires_target_and_device() {
        let mut config = DebugConfiguration::new(RequestKind::Launch);
        config.target = Some("emulator".to_string());
        assert!(LastDebugState::from_configuration(&config).is_none());

        config.device_id = Some("emulator-5554".to_string());
        let state = LastDebugState::from_configuration(&config).unwrap();
        // Falls back to the id when no name was recorded.
        assert_eq!(state.device_name, "emulator-5554");
        assert_eq!(state.label(), "Last debug session (emulator - emulator-5554)");
    }
}
