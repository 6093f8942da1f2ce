//! Command-line interface definitions for the `skiff` binary.
//!
//! This module centralises the clap parser structures so both the main
//! binary and the build script can reuse them when generating the manual
//! page.

use clap::Parser;

/// Top-level CLI for the `skiff` binary.
#[derive(Debug, Parser)]
#[command(
    name = "skiff",
    about = "Boot a fresh cloud server from an image and run a command on it",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create a server, boot it, and run a command over SSH.
    #[command(
        name = "run",
        about = "Create a server from IMAGE, boot it, and run COMMAND over SSH"
    )]
    Run(RunCommand),
}

/// Arguments for the `skiff run` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct RunCommand {
    /// Assign a name to the new server.
    ///
    /// When absent the server receives a generated name.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: Option<String>,
    /// Assign a bootscript to the new server.
    #[arg(long, value_name = "BOOTSCRIPT")]
    pub(crate) bootscript: Option<String>,
    /// Provide a metadata tag passed to the initrd (repeatable, in order,
    /// for example `boot=rescue`).
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE")]
    pub(crate) env: Vec<String>,
    /// Attach an additional volume of the given size (for example `50GB`).
    #[arg(short = 'v', long, value_name = "SIZE")]
    pub(crate) volume: Option<String>,
    /// Image to boot the server from (label or identifier).
    #[arg(value_name = "IMAGE")]
    pub(crate) image: String,
    /// Command to execute on the server (use -- to separate flags). When
    /// omitted, an interactive shell is opened instead.
    #[arg(value_name = "COMMAND", trailing_var_arg = true)]
    pub(crate) command: Vec<String>,
}
