//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn cli_without_arguments_prints_usage() {
    let mut cmd = cargo_bin_cmd!("skiff");
    cmd.assert().failure().stderr(contains("Usage"));
}

#[test]
fn cli_help_lists_the_run_subcommand() {
    let mut cmd = cargo_bin_cmd!("skiff");
    cmd.arg("--help");
    cmd.assert().success().stdout(contains("run"));
}

#[test]
fn cli_run_requires_an_image() {
    let mut cmd = cargo_bin_cmd!("skiff");
    cmd.arg("run");
    cmd.assert().failure().stderr(contains("IMAGE"));
}
