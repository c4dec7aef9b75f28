// src/core/project.rs

use crate::constants::TIAPP_FILENAME;
use lazy_static::lazy_static;
use regex::Regex;
use std::{fs, path::Path};
use thiserror::Error;

lazy_static! {
    static ref APP_ID_TAG_RE: Regex =
        Regex::new(r"<id>\s*([^<]+?)\s*</id>").expect("valid tiapp id regex");
}

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Could not read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{0}' does not declare an application id.")]
    MissingAppId(String),
}

/// Reads the application id declared in the project's `tiapp.xml`.
pub fn read_app_id(project_dir: &Path) -> Result<String, ProjectError> {
    let manifest = project_dir.join(TIAPP_FILENAME);
    let content = fs::read_to_string(&manifest).map_err(|e| ProjectError::Read {
        path: manifest.display().to_string(),
        source: e,
    })?;
    APP_ID_TAG_RE
        .captures(&content)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
        .ok_or_else(|| ProjectError::MissingAppId(manifest.display().to_string()))
}
