//! BDD scenarios for the run workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{RunContext, run_context};

#[scenario(
    path = "tests/features/run.feature",
    name = "Propagate remote exit codes through the run workflow"
)]
fn scenario_propagate_exit_codes(run_context: RunContext) {
    let _ = run_context;
}

#[scenario(
    path = "tests/features/run.feature",
    name = "Open the fallback shell when no command is given"
)]
fn scenario_fallback_shell(run_context: RunContext) {
    let _ = run_context;
}

#[scenario(
    path = "tests/features/run.feature",
    name = "Abort when the boot trigger is rejected"
)]
fn scenario_start_failure(run_context: RunContext) {
    let _ = run_context;
}

#[scenario(
    path = "tests/features/run.feature",
    name = "Abort when the provider reports a terminal boot state"
)]
fn scenario_terminal_boot_state(run_context: RunContext) {
    let _ = run_context;
}
