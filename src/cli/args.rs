// src/cli/args.rs
use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)] // Handlers receive the arguments after the command name.
pub struct BuildArgs {
    /// Target platform (android, ios, windows). Asked interactively when omitted.
    #[arg(long, short)]
    pub platform: Option<String>,

    /// Run target (emulator, simulator, device, ...). Asked interactively when omitted.
    #[arg(long, short)]
    pub target: Option<String>,

    /// Device, emulator or simulator id. Asked interactively when omitted.
    #[arg(long)]
    pub device_id: Option<String>,

    /// Name shown for the device in the remembered session.
    #[arg(long)]
    pub device_name: Option<String>,

    /// Project directory. Defaults to the current directory.
    #[arg(long)]
    pub project_dir: Option<String>,

    /// CLI log level (trace, debug, info, warn, error). Defaults to the configured level.
    #[arg(long)]
    pub log_level: Option<String>,

    /// The project is a native module, not an app.
    #[arg(long)]
    pub module: bool,

    /// Build without installing or launching.
    #[arg(long)]
    pub build_only: bool,

    #[arg(long)]
    pub liveview: bool,

    #[arg(long)]
    pub skip_js_minify: bool,

    #[arg(long)]
    pub source_maps: bool,

    /// Deploy type (development, test, production).
    #[arg(long)]
    pub deploy_type: Option<String>,

    /// iOS developer certificate name used for device builds.
    #[arg(long)]
    pub ios_certificate: Option<String>,

    /// iOS provisioning profile UUID used for device builds.
    #[arg(long)]
    pub ios_provisioning_profile: Option<String>,

    /// Run in the terminal so the CLI's own prompts can be answered.
    #[arg(long)]
    pub terminal: bool,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct DebugArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Debugger port. Defaults to 9000.
    #[arg(long)]
    pub port: Option<u16>,

    /// Resolve an attach configuration and print it instead of building.
    #[arg(long)]
    pub attach: bool,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct PackageArgs {
    /// Target platform. Asked interactively when omitted.
    #[arg(long, short)]
    pub platform: Option<String>,

    /// Distribution target (dist-playstore, dist-adhoc, dist-appstore, ...).
    #[arg(long, short)]
    pub target: Option<String>,

    #[arg(long)]
    pub project_dir: Option<String>,

    #[arg(long)]
    pub log_level: Option<String>,

    /// Output directory. Defaults to the configured distribution directory.
    #[arg(long)]
    pub output_dir: Option<String>,

    #[arg(long)]
    pub module: bool,

    /// iOS distribution certificate name.
    #[arg(long)]
    pub distribution_name: Option<String>,

    /// iOS provisioning profile UUID.
    #[arg(long)]
    pub pp_uuid: Option<String>,

    /// Android keystore location.
    #[arg(long)]
    pub keystore: Option<String>,

    /// Android keystore alias. Asked interactively when a keystore is given without one.
    #[arg(long)]
    pub alias: Option<String>,

    /// Android key password, when it differs from the keystore password.
    #[arg(long)]
    pub key_password: Option<String>,

    /// Windows signing certificate (.pfx).
    #[arg(long)]
    pub win_cert: Option<String>,

    #[arg(long)]
    pub pfx_password: Option<String>,

    #[arg(long)]
    pub win_publisher_id: Option<String>,

    #[arg(long)]
    pub terminal: bool,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct CreateArgs {
    /// Project name. Asked interactively when omitted.
    pub name: Option<String>,

    /// Application id, e.g. com.example.app.
    #[arg(long)]
    pub id: Option<String>,

    /// Platforms to support, comma separated. Defaults to those buildable on this host.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub platforms: Vec<String>,

    /// Directory the project is created in. Defaults to the current directory.
    #[arg(long)]
    pub workspace_dir: Option<String>,

    /// Create a native module instead of an app.
    #[arg(long)]
    pub module: bool,

    /// Overwrite an existing directory without asking.
    #[arg(long)]
    pub force: bool,

    /// Enable platform services for the new app.
    #[arg(long)]
    pub enable_services: bool,

    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long)]
    pub terminal: bool,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct CleanArgs {
    #[arg(long)]
    pub project_dir: Option<String>,

    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long)]
    pub terminal: bool,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct TaskArgs {
    /// Label of the task to run. Chosen interactively when omitted.
    pub label: Option<String>,

    #[arg(long)]
    pub project_dir: Option<String>,

    /// List the Titanium tasks and exit.
    #[arg(long, short)]
    pub list: bool,

    /// Android keystore password for package tasks.
    #[arg(long)]
    pub store_password: Option<String>,

    #[arg(long)]
    pub terminal: bool,
}
