// src/core/task_file.rs

use crate::{
    constants::TASKS_FILE,
    models::{IosSigning, KeystoreInfo, LogLevel, Platform, ProjectType, TaskDefinition, TaskKind},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fs, path::Path};
use thiserror::Error;

pub const BUILD_TASK_TYPE: &str = "titanium-build";
pub const PACKAGE_TASK_TYPE: &str = "titanium-package";

#[derive(Error, Debug)]
pub enum TaskFileError {
    #[error("Could not read tasks file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Tasks file '{path}' could not be parsed: {source}")]
    Parse {
        path: String,
        #[source]
        source: json5::Error,
    },
    #[error("No task labelled '{0}' was found.")]
    NotFound(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KeystoreReference {
    pub alias: String,
    pub location: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AndroidTaskSigning {
    pub keystore: KeystoreReference,
}

/// The `titaniumBuild` block of a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TitaniumBuild {
    pub platform: Platform,
    #[serde(default)]
    pub project_type: ProjectType,
    pub project_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<IosSigning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidTaskSigning>,
}

/// One entry of the tasks file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    pub label: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub titanium_build: TitaniumBuild,
}

impl TaskDescriptor {
    pub fn kind(&self) -> Option<TaskKind> {
        match self.task_type.as_str() {
            BUILD_TASK_TYPE => Some(TaskKind::Build),
            PACKAGE_TASK_TYPE => Some(TaskKind::Package),
            _ => None,
        }
    }

    pub fn to_definition(&self) -> Option<TaskDefinition> {
        let build = &self.titanium_build;
        let mut definition = TaskDefinition::new(self.kind()?, build.platform, &build.project_dir);
        definition.project_type = build.project_type;
        definition.target = build.target.clone();
        definition.device_id = build.device_id.clone();
        definition.build_only = build.build_only.unwrap_or(false);
        definition.log_level = build.log_level;
        definition.ios = build.ios.clone();
        definition.android = build.android.as_ref().map(|android| KeystoreInfo {
            location: android.keystore.location.clone(),
            alias: android.keystore.alias.clone(),
            ..KeystoreInfo::default()
        });
        Some(definition)
    }
}

#[derive(Deserialize, Debug, Default)]
struct TasksFile {
    #[serde(default)]
    tasks: Vec<Value>,
}

/// Parses the Titanium entries of a tasks file. The file is read as JSON5, so the
/// comments and trailing commas editors leave in `tasks.json` are accepted. Other
/// task types are skipped, as are Titanium entries that do not match the descriptor shape.
pub fn parse_tasks(content: &str) -> Result<Vec<TaskDescriptor>, json5::Error> {
    let file: TasksFile = json5::from_str(content)?;
    let descriptors = file
        .tasks
        .into_iter()
        .filter(|task| {
            task.get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| t == BUILD_TASK_TYPE || t == PACKAGE_TASK_TYPE)
        })
        .filter_map(|task| match serde_json::from_value::<TaskDescriptor>(task) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                log::warn!("Skipping malformed Titanium task: {}", e);
                None
            }
        })
        .collect();
    Ok(descriptors)
}

/// Loads the tasks declared in `<project_dir>/.vscode/tasks.json`. A missing file has no tasks.
pub fn load_tasks(project_dir: &Path) -> Result<Vec<TaskDescriptor>, TaskFileError> {
    let path = project_dir.join(TASKS_FILE);
    if !path.exists() {
        log::debug!("No tasks file at '{}'", path.display());
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path).map_err(|e| TaskFileError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_tasks(&content).map_err(|e| TaskFileError::Parse {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn find_task<'a>(
    tasks: &'a [TaskDescriptor],
    label: &str,
) -> Result<&'a TaskDescriptor, TaskFileError> {
    tasks
        .iter()
        .find(|task| task.label == label)
        .ok_or_else(|| TaskFileError::NotFound(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TASKS: &str = r#"{
    // Generated tasks
    "version": "2.0.0",
    "tasks": [
        {
            "label": "Titanium - iOS Device",
            "type": "titanium-build",
            "titaniumBuild": {
                "platform": "ios",
                "projectType": "app",
                "projectDir": "${workspaceFolder}",
                "target": "device",
                "deviceId": "abc-udid",
                "ios": {
                    "certificate": "iPhone Developer: Jane Doe (ABC123)",
                    "provisioningProfile": "acme-uuid"
                }
            }
        },
        {
            "label": "Titanium - Android Play Store",
            "type": "titanium-package",
            "titaniumBuild": {
                "platform": "android",
                "projectDir": "${workspaceFolder}",
                "target": "dist-playstore",
                "android": { "keystore": { "alias": "release", "location": "keys/release.jks" } }
            }
        },
        { "label": "npm: test", "type": "npm", "script": "test" },
        { "label": "Broken", "type": "titanium-build", "titaniumBuild": { "platform": "symbian" } }
    ]
}"#;

    #[test]
    fn test_parse_keeps_only_valid_titanium_tasks() {
        let tasks = parse_tasks(TASKS).unwrap();
        let labels: Vec<&str> = tasks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["Titanium - iOS Device", "Titanium - Android Play Store"]);
    }

    #[test]
    fn test_descriptors_convert_to_definitions() {
        let tasks = parse_tasks(TASKS).unwrap();

        let build = find_task(&tasks, "Titanium - iOS Device")
            .unwrap()
            .to_definition()
            .unwrap();
        assert_eq!(build.kind, TaskKind::Build);
        assert_eq!(build.platform, Platform::Ios);
        assert_eq!(build.device_id.as_deref(), Some("abc-udid"));
        assert_eq!(
            build.ios.as_ref().map(|s| s.provisioning_profile.as_str()),
            Some("acme-uuid")
        );
        assert!(!build.build_only);

        let package = find_task(&tasks, "Titanium - Android Play Store")
            .unwrap()
            .to_definition()
            .unwrap();
        assert_eq!(package.kind, TaskKind::Package);
        assert_eq!(package.project_type, ProjectType::App);
        let keystore = package.android.unwrap();
        assert_eq!(keystore.alias, "release");
        assert!(keystore.password.is_none());
    }

    #[test]
    fn test_trailing_line_comments_are_accepted() {
        let content = r#"{
            "version": "2.0.0", // schema version
            "tasks": [
                { "label": "Emulator", "type": "titanium-build", // quick run
                  "titaniumBuild": { "platform": "android", "projectDir": "app", "target": "emulator" } }
            ]
        }"#;
        let tasks = parse_tasks(content).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].titanium_build.target.as_deref(), Some("emulator"));
    }

    #[test]
    fn test_block_comments_are_accepted() {
        let content = r#"/* generated */
        {
            "tasks": [
                /* disabled: { "label": "Old", "type": "titanium-build" }, */
                { "label": "Simulator", "type": "titanium-build",
                  "titaniumBuild": { "platform": /* host */ "ios", "projectDir": "app" } }
            ]
        }"#;
        let tasks = parse_tasks(content).unwrap();
        let labels: Vec<&str> = tasks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["Simulator"]);
        assert_eq!(tasks[0].titanium_build.platform, Platform::Ios);
    }

    #[test]
    fn test_trailing_commas_are_accepted() {
        let content = r#"{
            "version": "2.0.0",
            "tasks": [
                {
                    "label": "Emulator",
                    "type": "titanium-build",
                    "titaniumBuild": { "platform": "android", "projectDir": "app", },
                },
            ],
        }"#;
        let tasks = parse_tasks(content).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].label, "Emulator");
    }

    #[test]
    fn test_load_tasks_from_project() {
        let dir = TempDir::new().unwrap();
        assert!(load_tasks(dir.path()).unwrap().is_empty());

        fs::create_dir_all(dir.path().join(".vscode")).unwrap();
        fs::write(dir.path().join(".vscode/tasks.json"), TASKS).unwrap();
        assert_eq!(load_tasks(dir.path()).unwrap().len(), 2);
        assert!(matches!(
            find_task(&load_tasks(dir.path()).unwrap(), "missing"),
            Err(TaskFileError::NotFound(_))
        ));

        fs::write(dir.path().join(".vscode/tasks.json"), "{ nope").unwrap();
        assert!(matches!(load_tasks(dir.path()), Err(TaskFileError::Parse { .. })));
    }
}
