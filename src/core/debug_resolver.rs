// src/core/debug_resolver.rs

use crate::{
    constants::{DEFAULT_DEBUG_PORT, LAST_ANDROID_DEBUG_KEY, LAST_IOS_DEBUG_KEY},
    core::{
        catalog::{CatalogError, DeviceCatalog, profile_matches_app_id},
        prompter::{PromptError, Prompter},
        state_store::{StateStore, StoreError},
    },
    models::{
        CertificateKind, DebugConfiguration, IosSigning, LastDebugState, LogLevel, Platform,
        ProfileKind, RequestKind, name_for_target,
    },
};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Failed to start debug session as no platform was selected")]
    NoPlatformSelected,
    #[error("Failed to start debug session as no target was selected")]
    NoTargetSelected,
    #[error("Failed to start debug session as no device was selected")]
    NoDeviceSelected,
    #[error("Failed to start debug session as no code signing information was selected")]
    NoSigningSelected,
    #[error("Attaching to a running Android app is currently not supported")]
    AttachUnsupported,
    #[error("No devices are available for target '{target}' on {platform}")]
    NoDevices { platform: Platform, target: String },
    #[error("No valid iOS {0} certificates were found")]
    NoCertificates(&'static str),
    #[error("No provisioning profiles match the application id '{0}'")]
    NoProfiles(String),
    #[error(transparent)]
    Prompt(PromptError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ResolveError {
    /// Whether the user backed out of a prompt, as opposed to something failing.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::NoPlatformSelected
                | Self::NoTargetSelected
                | Self::NoDeviceSelected
                | Self::NoSigningSelected
                | Self::Prompt(PromptError::Cancelled)
        )
    }
}

/// Maps a cancelled prompt to the message for the step that asked it.
fn answer<T>(result: Result<T, PromptError>, cancelled: ResolveError) -> Result<T, ResolveError> {
    match result {
        Ok(value) => Ok(value),
        Err(PromptError::Cancelled) => Err(cancelled),
        Err(e) => Err(ResolveError::Prompt(e)),
    }
}

/// Ambient values the resolver falls back on.
#[derive(Debug, Clone)]
pub struct ResolverEnvironment {
    pub workspace_folder: PathBuf,
    pub log_level: LogLevel,
    /// Platforms offered when none is configured.
    pub platforms: Vec<Platform>,
    /// Used to narrow provisioning profiles; all profiles are offered when unknown.
    pub app_id: Option<String>,
}

/// Store key holding the last debug selection for `platform`.
pub fn last_debug_key(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::Android => Some(LAST_ANDROID_DEBUG_KEY),
        Platform::Ios => Some(LAST_IOS_DEBUG_KEY),
        Platform::Windows => None,
    }
}

/// Asks for an iOS certificate of `kind`, then for a provisioning profile suited to
/// `target` and `app_id`. Cancellation surfaces as `ResolveError::Prompt(Cancelled)`.
pub fn select_ios_signing(
    prompter: &dyn Prompter,
    catalog: &dyn DeviceCatalog,
    kind: CertificateKind,
    target: &str,
    app_id: Option<&str>,
) -> Result<IosSigning, ResolveError> {
    let certificates = catalog.ios_certificates(kind)?;
    if certificates.is_empty() {
        return Err(ResolveError::NoCertificates(match kind {
            CertificateKind::Developer => "developer",
            CertificateKind::Distribution => "distribution",
        }));
    }
    let labels: Vec<String> = certificates.iter().map(|c| c.full_name.clone()).collect();
    let chosen = prompter
        .choose_one("Select a certificate", &labels)
        .map_err(ResolveError::Prompt)?;
    let certificate = certificates
        .get(chosen)
        .ok_or(ResolveError::Prompt(PromptError::Cancelled))?;

    let profiles: Vec<_> = catalog
        .provisioning_profiles(ProfileKind::for_target(target))?
        .into_iter()
        .filter(|profile| app_id.is_none_or(|id| profile_matches_app_id(&profile.app_id, id)))
        .collect();
    if profiles.is_empty() {
        return Err(ResolveError::NoProfiles(app_id.unwrap_or("*").to_string()));
    }
    let labels: Vec<String> = profiles
        .iter()
        .map(|p| format!("{} ({})", p.name, p.uuid))
        .collect();
    let chosen = prompter
        .choose_one("Select a provisioning profile", &labels)
        .map_err(ResolveError::Prompt)?;
    let profile = profiles
        .get(chosen)
        .ok_or(ResolveError::Prompt(PromptError::Cancelled))?;

    Ok(IosSigning {
        certificate: certificate.name.clone(),
        provisioning_profile: profile.uuid.clone(),
    })
}

/// Fills the missing fields of a debug configuration, in a fixed order:
/// project dir, ports, log level, platform, target, device, iOS signing.
///
/// Nothing is persisted while resolving. Call [`remember`](Self::remember) once the
/// resolved configuration has run successfully.
pub struct DebugConfigurationResolver<'a> {
    prompter: &'a dyn Prompter,
    catalog: &'a dyn DeviceCatalog,
    store: &'a dyn StateStore,
    environment: ResolverEnvironment,
}

impl fmt::Debug for DebugConfigurationResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugConfigurationResolver")
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl<'a> DebugConfigurationResolver<'a> {
    pub fn new(
        prompter: &'a dyn Prompter,
        catalog: &'a dyn DeviceCatalog,
        store: &'a dyn StateStore,
        environment: ResolverEnvironment,
    ) -> Self {
        Self {
            prompter,
            catalog,
            store,
            environment,
        }
    }

    pub fn resolve(
        &self,
        mut config: DebugConfiguration,
    ) -> Result<DebugConfiguration, ResolveError> {
        if config.project_dir.is_none() {
            config.project_dir = Some(self.environment.workspace_folder.clone());
        }
        if config.port.is_none() {
            config.port = Some(DEFAULT_DEBUG_PORT);
            config.debug_port = Some(DEFAULT_DEBUG_PORT);
        }
        if config.log_level.is_none() {
            config.log_level = Some(self.environment.log_level);
        }

        let platform = match config.platform {
            Some(platform) => platform,
            None => self.choose_platform()?,
        };
        config.platform = Some(platform);

        if platform == Platform::Android && config.request == RequestKind::Attach {
            return Err(ResolveError::AttachUnsupported);
        }

        if config.target.is_none() {
            self.choose_target(platform, &mut config)?;
        }

        if config.device_id.is_none() {
            self.choose_device(platform, &mut config)?;
        }

        if config.needs_ios_signing() && config.ios_certificate.is_none() {
            let target = config.target.clone().unwrap_or_default();
            let signing = select_ios_signing(
                self.prompter,
                self.catalog,
                CertificateKind::Developer,
                &target,
                self.environment.app_id.as_deref(),
            )
            .map_err(|e| match e {
                ResolveError::Prompt(PromptError::Cancelled) => ResolveError::NoSigningSelected,
                other => other,
            })?;
            config.ios_certificate = Some(signing.certificate);
            config.ios_provisioning_profile = Some(signing.provisioning_profile);
        }

        log::debug!("Resolved debug configuration: {:?}", config);
        Ok(config)
    }

    /// Stores the device selection of a configuration that ran successfully, so
    /// the next resolution can offer it. Returns whether anything was written.
    pub fn remember(&self, config: &DebugConfiguration) -> Result<bool, StoreError> {
        let Some(key) = config.platform.and_then(last_debug_key) else {
            return Ok(false);
        };
        let Some(state) = LastDebugState::from_configuration(config) else {
            return Ok(false);
        };
        self.store.set(key, serde_json::to_value(&state)?)?;
        Ok(true)
    }

    /// A missing, unreadable or malformed record all read as "no last session".
    fn load_last_state(&self, platform: Platform) -> Option<LastDebugState> {
        let key = last_debug_key(platform)?;
        let value = match self.store.get(key) {
            Ok(value) => value?,
            Err(e) => {
                log::debug!("Could not read '{}': {}", key, e);
                return None;
            }
        };
        match serde_json::from_value::<LastDebugState>(value) {
            Ok(state) => Some(state),
            Err(e) => {
                log::debug!("Ignoring malformed '{}' record: {}", key, e);
                None
            }
        }
    }

    fn choose_platform(&self) -> Result<Platform, ResolveError> {
        let platforms = &self.environment.platforms;
        let labels: Vec<String> = platforms
            .iter()
            .map(|p| p.display_name().to_string())
            .collect();
        let chosen = answer(
            self.prompter.choose_one("Select a platform", &labels),
            ResolveError::NoPlatformSelected,
        )?;
        platforms
            .get(chosen)
            .copied()
            .ok_or(ResolveError::NoPlatformSelected)
    }

    fn choose_target(
        &self,
        platform: Platform,
        config: &mut DebugConfiguration,
    ) -> Result<(), ResolveError> {
        let targets = platform.run_targets();
        let mut labels: Vec<String> = targets.iter().map(|t| name_for_target(t)).collect();
        let last = self.load_last_state(platform);
        if let Some(state) = &last {
            labels.push(state.label());
        }

        let chosen = answer(
            self.prompter.choose_one("Select a target", &labels),
            ResolveError::NoTargetSelected,
        )?;
        match (targets.get(chosen), &last) {
            (Some(target), _) => config.target = Some((*target).to_string()),
            (None, Some(state)) => {
                log::debug!("Resuming last debug session: {}", state.label());
                state.apply_to(config);
            }
            (None, None) => return Err(ResolveError::NoTargetSelected),
        }
        Ok(())
    }

    fn choose_device(
        &self,
        platform: Platform,
        config: &mut DebugConfiguration,
    ) -> Result<(), ResolveError> {
        let target = config.target.clone().unwrap_or_default();
        let devices = self.catalog.devices(platform, &target)?;
        if devices.is_empty() {
            return Err(ResolveError::NoDevices { platform, target });
        }
        let labels: Vec<String> = devices.iter().map(|d| d.name.clone()).collect();
        let chosen = answer(
            self.prompter.choose_one("Select a device", &labels),
            ResolveError::NoDeviceSelected,
        )?;
        let device = devices.get(chosen).ok_or(ResolveError::NoDeviceSelected)?;
        config.device_id = Some(device.id.clone());
        config.device_name = Some(device.name.clone());
        Ok(())
    }
}
