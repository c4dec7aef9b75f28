// src/core/catalog.rs

use crate::{
    core::arguments::CommandLine,
    models::{Certificate, CertificateKind, Device, Platform, ProfileKind, ProvisioningProfile},
    system::session::{ExecutionError, ProcessSession},
};
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;
use tokio::runtime::Runtime;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to query the build environment: {0}")]
    Query(#[from] ExecutionError),
    #[error("Failed to parse the build environment information: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of the devices, certificates and provisioning profiles offered during resolution.
pub trait DeviceCatalog {
    fn devices(&self, platform: Platform, target: &str) -> Result<Vec<Device>, CatalogError>;
    fn ios_certificates(&self, kind: CertificateKind) -> Result<Vec<Certificate>, CatalogError>;
    fn provisioning_profiles(
        &self,
        kind: ProfileKind,
    ) -> Result<Vec<ProvisioningProfile>, CatalogError>;
}

/// Whether a profile registered for `profile_app_id` can sign `app_id`.
/// `*` matches every id and a trailing `*` matches by prefix.
pub fn profile_matches_app_id(profile_app_id: &str, app_id: &str) -> bool {
    if profile_app_id == "*" || profile_app_id == app_id {
        return true;
    }
    match profile_app_id.strip_suffix('*') {
        Some(prefix) => app_id.starts_with(prefix),
        None => false,
    }
}

/// Catalog backed by the CLI's `ti info -o json` report, fetched once on first use.
pub struct InfoCatalog<'a> {
    session: &'a ProcessSession,
    runtime: &'a Runtime,
    info: OnceLock<Value>,
}

impl std::fmt::Debug for InfoCatalog<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfoCatalog")
            .field("loaded", &self.info.get().is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> InfoCatalog<'a> {
    /// `runtime` drives the query; the catalog must be used outside of it.
    pub fn new(session: &'a ProcessSession, runtime: &'a Runtime) -> Self {
        Self {
            session,
            runtime,
            info: OnceLock::new(),
        }
    }

    fn info(&self) -> Result<&Value, CatalogError> {
        if let Some(info) = self.info.get() {
            return Ok(info);
        }
        log::debug!("Querying environment information from '{}'", self.session.command());
        let line = CommandLine::new(["ti", "info", "-o", "json"]);
        let response = self.runtime.block_on(self.session.run_in_background(&line))?;
        let parsed: Value = serde_json::from_str(&response.stdout)?;
        Ok(self.info.get_or_init(|| parsed))
    }
}

impl DeviceCatalog for InfoCatalog<'_> {
    fn devices(&self, platform: Platform, target: &str) -> Result<Vec<Device>, CatalogError> {
        Ok(devices_from_info(self.info()?, platform, target))
    }

    fn ios_certificates(&self, kind: CertificateKind) -> Result<Vec<Certificate>, CatalogError> {
        Ok(certificates_from_info(self.info()?, kind))
    }

    fn provisioning_profiles(
        &self,
        kind: ProfileKind,
    ) -> Result<Vec<ProvisioningProfile>, CatalogError> {
        Ok(profiles_from_info(self.info()?, kind))
    }
}

// --- `ti info` readers ---

fn str_field<'v>(entry: &'v Value, keys: &[&str]) -> Option<&'v str> {
    keys.iter().find_map(|key| entry.get(key).and_then(Value::as_str))
}

fn flag(entry: &Value, key: &str) -> bool {
    entry.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn device_from(entry: &Value, suffix: Option<&str>) -> Option<Device> {
    let id = str_field(entry, &["udid", "id"])?;
    let name = str_field(entry, &["name"]).unwrap_or(id);
    let name = match suffix {
        Some(suffix) => format!("{name} ({suffix})"),
        None => name.to_string(),
    };
    Some(Device {
        id: id.to_string(),
        name,
    })
}

fn device_list(value: Option<&Value>) -> Vec<Device> {
    value
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(|e| device_from(e, None)).collect())
        .unwrap_or_default()
}

/// Reads lists grouped by version, e.g. `{"13.0": [...], "14.2": [...]}`.
fn grouped_device_list(value: Option<&Value>) -> Vec<Device> {
    let Some(groups) = value.and_then(Value::as_object) else {
        return Vec::new();
    };
    groups
        .iter()
        .flat_map(|(version, entries)| {
            entries
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(move |e| device_from(e, Some(version.as_str())))
        })
        .collect()
}

pub(crate) fn devices_from_info(info: &Value, platform: Platform, target: &str) -> Vec<Device> {
    let section = info.get(platform.as_str());
    let field = |name: &str| section.and_then(|s| s.get(name));
    match (platform, target) {
        (Platform::Android, "emulator") => device_list(field("emulators")),
        (Platform::Android, "device") => device_list(field("devices")),
        (Platform::Ios, "simulator") => {
            grouped_device_list(field("simulators").and_then(|s| s.get("ios")))
        }
        (Platform::Ios, "device") => device_list(field("devices")),
        (Platform::Windows, "wp-emulator") => grouped_device_list(field("emulators")),
        (Platform::Windows, "wp-device") => device_list(field("devices")),
        (Platform::Windows, "ws-local") => vec![Device {
            id: "local".to_string(),
            name: "Local Machine".to_string(),
        }],
        _ => {
            log::debug!("No devices are listed for target '{}' on {}", target, platform);
            Vec::new()
        }
    }
}

pub(crate) fn certificates_from_info(info: &Value, kind: CertificateKind) -> Vec<Certificate> {
    let kind_key = match kind {
        CertificateKind::Developer => "developer",
        CertificateKind::Distribution => "distribution",
    };
    let Some(keychains) = info
        .pointer("/ios/certs/keychains")
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };

    let mut certificates: Vec<Certificate> = Vec::new();
    for entry in keychains
        .values()
        .filter_map(|keychain| keychain.get(kind_key).and_then(Value::as_array))
        .flatten()
    {
        if flag(entry, "expired") || flag(entry, "invalid") {
            continue;
        }
        let Some(name) = str_field(entry, &["name"]) else {
            continue;
        };
        // The same certificate can live in several keychains.
        if certificates.iter().any(|c| c.name == name) {
            continue;
        }
        certificates.push(Certificate {
            name: name.to_string(),
            full_name: str_field(entry, &["fullname", "fullName"])
                .unwrap_or(name)
                .to_string(),
        });
    }
    certificates
}

pub(crate) fn profiles_from_info(info: &Value, kind: ProfileKind) -> Vec<ProvisioningProfile> {
    let kind_key = match kind {
        ProfileKind::Development => "development",
        ProfileKind::AdHoc => "adhoc",
        ProfileKind::Distribution => "distribution",
    };
    info.pointer(&format!("/ios/provisioning/{kind_key}"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|entry| !flag(entry, "expired"))
        .filter_map(|entry| {
            Some(ProvisioningProfile {
                uuid: str_field(entry, &["uuid"])?.to_string(),
                name: str_field(entry, &["name"]).unwrap_or_default().to_string(),
                app_id: str_field(entry, &["appId"]).unwrap_or("*").to_string(),
            })
        })
        .collect()
}
