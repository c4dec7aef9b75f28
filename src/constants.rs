// src/constants.rs

/// The name of the directory holding tibuild state inside a project.
pub const STATE_DIR: &str = ".tibuild";

/// The name of the persisted workspace state file (inside .tibuild/).
pub const STATE_FILENAME: &str = "state.json";

/// The name of the global configuration file (in ~/.config/tibuild/).
pub const CONFIG_FILENAME: &str = "config.toml";

/// Location of the tasks file, relative to the project directory.
pub const TASKS_FILE: &str = ".vscode/tasks.json";

/// Project manifest used to read the application id.
pub const TIAPP_FILENAME: &str = "tiapp.xml";

/// Default CLI used to drive builds.
pub const DEFAULT_CLI_COMMAND: &str = "appc";

/// Port used for both the debugger and the app when a launch config omits it.
pub const DEFAULT_DEBUG_PORT: u16 = 9000;

/// Flag appended to every captured-output run.
pub const NO_PROMPT_FLAG: &str = "--no-prompt";

/// Distribution target whose output location is implied by the CLI.
pub const APP_STORE_TARGET: &str = "dist-appstore";

/// Windows target that never receives a device id.
pub const WINDOWS_LOCAL_TARGET: &str = "ws-local";

pub const LAST_ANDROID_DEBUG_KEY: &str = "lastAndroidDebug";
pub const LAST_IOS_DEBUG_KEY: &str = "lastiOSDebug";

/// Placeholder accepted in project directories, replaced by the workspace folder.
pub const WORKSPACE_FOLDER_TOKEN: &str = "${workspaceFolder}";
