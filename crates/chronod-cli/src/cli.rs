//! Command-line surface. Command words are the protocol's uppercase names;
//! validation failures map to distinct process exit codes before any channel
//! I/O happens.

use clap::{Args, Parser, Subcommand};

/// Distinct exit codes promised by the CLI contract.
pub mod exit_code {
    /// Server failed to start or crashed during startup.
    pub const SERVER_FAILED: u8 = 1;
    /// No command word was given.
    pub const NO_COMMAND: u8 = 2;
    /// The command word was recognized but its arguments were wrong.
    pub const BAD_ARGUMENT_COUNT: u8 = 3;
    /// The command word itself was not recognized.
    pub const UNKNOWN_COMMAND: u8 = 4;
    /// Client-side channel I/O failed.
    pub const CLIENT_FAILED: u8 = 5;
}

#[derive(Debug, Parser)]
#[command(
    name = "chronod",
    version,
    about = "Single-machine job scheduler",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a program once at an offset from now.
    #[command(name = "RELATIVE")]
    Relative(ScheduleArgs),

    /// Run a program once at an absolute local time (year, day-of-year,
    /// hour, minute, second).
    #[command(name = "ABSOLUTE")]
    Absolute(ScheduleArgs),

    /// Run a program repeatedly: first at an offset from now, then at a
    /// fixed period derived from the same five fields.
    #[command(name = "PERIODIC")]
    Periodic(ScheduleArgs),

    /// List pending tasks.
    #[command(name = "DISPLAY")]
    Display,

    /// Cancel a pending task by id.
    #[command(name = "CANCEL")]
    Cancel { task_id: u64 },

    /// Stop the running server.
    #[command(name = "SHUTDOWN")]
    Shutdown,

    /// Run the server in the foreground (used by the background bootstrap).
    #[command(name = "serve", hide = true)]
    Serve,
}

#[derive(Debug, Args)]
#[command(allow_negative_numbers = true)]
pub struct ScheduleArgs {
    pub years: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub program: String,
    /// Arguments passed to the program when it runs.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Map a clap parse failure onto the contract's exit codes.
pub fn exit_code_for(err: &clap::Error) -> u8 {
    use clap::error::ErrorKind;
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            exit_code::NO_COMMAND
        }
        ErrorKind::InvalidSubcommand => exit_code::UNKNOWN_COMMAND,
        _ => exit_code::BAD_ARGUMENT_COUNT,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
