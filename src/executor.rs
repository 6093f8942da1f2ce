//! Remote command execution over the system SSH client.
//!
//! The executor shells out to `ssh` rather than speaking the protocol
//! itself. Remote stdout and stderr stream to the caller's corresponding
//! streams as they arrive because the spawned process inherits them; the
//! call blocks for the lifetime of the session and reports the remote exit
//! status verbatim.

use std::ffi::OsString;
use std::process::{Command, Stdio};

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Result of a finished remote session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RemoteStatus {
    /// Exit status reported by the remote process, if available. `None`
    /// means the session ended without a status (for example the process
    /// was killed by a signal).
    pub code: Option<i32>,
}

impl RemoteStatus {
    /// Returns `true` when the exit status equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Abstraction over process spawning to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, wiring the caller's
    /// standard streams through, and returns its exit status.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Spawn`] if the program cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<RemoteStatus, ExecError>;
}

/// Real runner that spawns the program with inherited stdio so remote
/// output streams as it arrives instead of being buffered.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamingProcessRunner;

impl CommandRunner for StreamingProcessRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<RemoteStatus, ExecError> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|err| ExecError::Spawn {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(RemoteStatus {
            code: status.code(),
        })
    }
}

/// Errors raised while establishing a remote session.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ExecError {
    /// Raised when the transport binary cannot be started.
    #[error("failed to start {program}: {message}")]
    Spawn {
        /// Program that could not be spawned.
        program: String,
        /// Underlying operating system error.
        message: String,
    },
    /// Raised when the SSH configuration is incomplete.
    #[error("invalid ssh configuration: {0}")]
    InvalidConfig(String),
}

/// SSH settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "SKIFF")]
pub struct SshConfig {
    /// Path to the `ssh` executable.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Remote user to connect as.
    #[ortho_config(default = "root".to_owned())]
    pub ssh_user: String,
    /// TCP port for SSH on the remote server.
    #[ortho_config(default = 22)]
    pub ssh_port: u16,
    /// Whether to force batch mode to avoid password prompts.
    #[ortho_config(default = true)]
    pub ssh_batch_mode: bool,
    /// Whether to enforce host key checking; defaults to disabling it
    /// because every run targets a freshly allocated host.
    #[ortho_config(default = false)]
    pub ssh_strict_host_key_checking: bool,
    /// Known hosts file override; defaults to `/dev/null` for ephemeral
    /// hosts.
    #[ortho_config(default = "/dev/null".to_owned())]
    pub ssh_known_hosts_file: String,
    /// Path to the SSH private key file for remote authentication.
    /// Supports tilde expansion (`~/.ssh/id_ed25519`). Optional; when not
    /// provided, SSH falls back to its default key locations.
    pub ssh_identity_file: Option<String>,
}

impl SshConfig {
    /// Loads configuration without attempting to parse CLI arguments.
    /// Values merge defaults, configuration files, and environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::InvalidConfig`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ExecError> {
        Self::load_from_iter([std::ffi::OsString::from("skiff")])
            .map_err(|err| ExecError::InvalidConfig(err.to_string()))
    }

    /// Ensures configuration values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.ssh_bin.trim().is_empty() {
            return Err(ExecError::InvalidConfig("ssh_bin must not be empty".to_owned()));
        }
        if self.ssh_user.trim().is_empty() {
            return Err(ExecError::InvalidConfig(
                "ssh_user must not be empty".to_owned(),
            ));
        }
        if let Some(identity) = &self.ssh_identity_file
            && identity.trim().is_empty()
        {
            return Err(ExecError::InvalidConfig(
                "ssh_identity_file must not be blank".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Expands a leading `~/` prefix to the user's home directory.
///
/// If the `HOME` environment variable is not set, the input is returned
/// unchanged.
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return format!("{}/{rest}", home.to_string_lossy());
    }
    path.to_owned()
}

/// Remote-shell transport consumed by the workflow.
///
/// The call blocks for the duration of remote execution, streams remote
/// output as it arrives, and returns the remote exit status. An error is
/// raised only when the session could not be established.
pub trait RemoteExecutor {
    /// Transport specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs `command` on the server at `address` and returns its exit
    /// status.
    ///
    /// # Errors
    ///
    /// Returns the transport error when the session could not be
    /// established.
    fn run(
        &self,
        address: &str,
        command: &str,
        interactive: bool,
    ) -> Result<RemoteStatus, Self::Error>;
}

/// SSH-backed executor wiring [`SshConfig`] options into each session.
#[derive(Clone, Debug)]
pub struct SshExecutor<R: CommandRunner = StreamingProcessRunner> {
    config: SshConfig,
    runner: R,
}

impl SshExecutor<StreamingProcessRunner> {
    /// Convenience constructor that wires the real streaming runner.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::InvalidConfig`] when validation fails.
    pub fn with_process_runner(config: SshConfig) -> Result<Self, ExecError> {
        Self::new(config, StreamingProcessRunner)
    }
}

impl<R: CommandRunner> SshExecutor<R> {
    /// Creates a new executor using the provided runner and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::InvalidConfig`] when configuration validation
    /// fails.
    pub fn new(config: SshConfig, runner: R) -> Result<Self, ExecError> {
        config.validate()?;
        Ok(Self { config, runner })
    }

    /// Returns a reference to the underlying configuration.
    #[must_use]
    pub const fn config(&self) -> &SshConfig {
        &self.config
    }

    fn build_ssh_args(&self, address: &str, command: &str, interactive: bool) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("-p"),
            OsString::from(self.config.ssh_port.to_string()),
        ];

        if let Some(ref identity_file) = self.config.ssh_identity_file {
            let expanded = expand_tilde(identity_file);
            args.push(OsString::from("-i"));
            args.push(OsString::from(expanded));
        }

        if self.config.ssh_batch_mode {
            args.push(OsString::from("-o"));
            args.push(OsString::from("BatchMode=yes"));
        }

        if !self.config.ssh_strict_host_key_checking {
            args.push(OsString::from("-o"));
            args.push(OsString::from("StrictHostKeyChecking=no"));
        }

        if !self.config.ssh_known_hosts_file.trim().is_empty() {
            args.push(OsString::from("-o"));
            args.push(OsString::from(format!(
                "UserKnownHostsFile={}",
                self.config.ssh_known_hosts_file
            )));
        }

        if interactive {
            // Force a tty even without a local one so remote shells behave.
            args.push(OsString::from("-t"));
            args.push(OsString::from("-t"));
        }

        args.push(OsString::from(format!(
            "{}@{address}",
            self.config.ssh_user
        )));
        args.push(OsString::from(command));
        args
    }
}

impl<R: CommandRunner> RemoteExecutor for SshExecutor<R> {
    type Error = ExecError;

    fn run(
        &self,
        address: &str,
        command: &str,
        interactive: bool,
    ) -> Result<RemoteStatus, ExecError> {
        let args = self.build_ssh_args(address, command, interactive);
        self.runner.run(&self.config.ssh_bin, &args)
    }
}
