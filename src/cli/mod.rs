use clap::Parser;

pub mod args;
pub mod handlers;

const COMMANDS_HELP: &str = "\
Commands:
  build, run       Build and run an app on an emulator, simulator or device
  debug            Like build, with the debugger port enabled (--attach prints the resolved configuration)
  package, dist    Produce a distribution build (Play Store, Ad-Hoc, App Store, ...)
  create, new      Create a new app or module
  clean            Remove the build output of a project
  task             Run a task from .vscode/tasks.json

Run 'tibuild <command> --help' for the options of a command.";

/// tibuild: drives Titanium build, package and debug runs through the Titanium CLI.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    after_help = COMMANDS_HELP,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// The command to run.
    pub action: Option<String>,

    /// Arguments handed to the command's own parser.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}
