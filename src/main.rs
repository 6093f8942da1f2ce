//! Binary entry point for the Skiff CLI.

use std::env;
use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;

use skiff::{
    CancelToken, ExecError, ProvisionRequest, RequestError, RunError, RunWorkflow,
    ScalewayClientError, ScalewayConfig, ScalewayControlPlane, SshConfig, SshExecutor,
};

mod cli;

use cli::{Cli, RunCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("control plane error: {0}")]
    ControlPlane(String),
    #[error("executor error: {0}")]
    Executor(String),
    #[error("invalid provision request: {0}")]
    Request(#[from] RequestError),
    #[error("invalid command argument: {0}")]
    InvalidCommand(String),
    #[error("remote command terminated without an exit status")]
    MissingExitCode,
    #[error("remote run failed: {0}")]
    Run(#[from] RunError<ScalewayClientError, ExecError>),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Run(command) => run_command(command).await,
    }
}

async fn run_command(args: RunCommand) -> Result<i32, CliError> {
    if let Some(result) = fake_run_from_env() {
        return result;
    }

    if let Some(err) = prefail_from_env() {
        return Err(err);
    }

    validate_command_args(&args.command)?;
    let request = build_request(&args)?;

    let scaleway_config = ScalewayConfig::load_without_cli_args()
        .map_err(|err| CliError::Config(err.to_string()))?;
    let control_plane = ScalewayControlPlane::new(scaleway_config)
        .map_err(|err| CliError::ControlPlane(err.to_string()))?;

    let ssh_config =
        SshConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    let executor = SshExecutor::with_process_runner(ssh_config)
        .map_err(|err| CliError::Executor(err.to_string()))?;

    let workflow = RunWorkflow::new(control_plane, executor);
    let outcome = workflow
        .execute(&request, &args.command, &CancelToken::new())
        .await?;

    outcome.exit_code.ok_or(CliError::MissingExitCode)
}

fn build_request(args: &RunCommand) -> Result<ProvisionRequest, RequestError> {
    ProvisionRequest::builder()
        .image(args.image.clone())
        .name(args.name.clone())
        .bootscript(args.bootscript.clone())
        .env_tags(args.env.iter().cloned())
        .extra_volume(args.volume.clone())
        .build()
}

fn validate_command_args(args: &[String]) -> Result<(), CliError> {
    for arg in args {
        if arg
            .chars()
            .any(|ch| matches!(ch, '\n' | '\r' | '\u{0000}'..='\u{001F}' | '\u{007F}'))
        {
            return Err(CliError::InvalidCommand(String::from(concat!(
                "command arguments must not contain control characters (ASCII ",
                "0x00-0x1F or 0x7F, e.g. newline, carriage return, tab, NUL)"
            ))));
        }
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

fn fake_run_from_env() -> Option<Result<i32, CliError>> {
    let mode = env::var("SKIFF_FAKE_RUN_MODE").ok()?;
    match mode.as_str() {
        "exit-0" => {
            writeln!(io::stdout(), "fake-stdout").ok();
            writeln!(io::stderr(), "fake-stderr").ok();
            Some(Ok(0))
        }
        "exit-7" => {
            writeln!(io::stdout(), "fake-stdout").ok();
            writeln!(io::stderr(), "fake-stderr").ok();
            Some(Ok(7))
        }
        "missing-exit" => {
            writeln!(io::stdout(), "fake-stdout").ok();
            writeln!(io::stderr(), "fake-stderr").ok();
            Some(Err(CliError::MissingExitCode))
        }
        _ => None,
    }
}

fn prefail_from_env() -> Option<CliError> {
    let mode = env::var("SKIFF_FAKE_RUN_PREFAIL").ok()?;
    match mode.as_str() {
        "config" => Some(CliError::Config(String::from("fake"))),
        "control-plane" => Some(CliError::ControlPlane(String::from("fake"))),
        "run" => Some(CliError::Run(RunError::Provision(
            ScalewayClientError::Config(String::from("fake")),
        ))),
        _ => None,
    }
}
