//! BDD step definitions for the run workflow.

use rstest_bdd_macros::{given, then, when};
use skiff::{CancelToken, FALLBACK_SHELL, RunWorkflow, ServerState};
use tokio::runtime::Runtime;

use super::test_helpers::{READY_ADDRESS, RunContext, RunResult, poller};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("runtime setup failed: {0}")]
    Runtime(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a bootable server and a scripted session")]
fn bootable_server(run_context: RunContext) -> RunContext {
    run_context
        .control_plane
        .push_state(ServerState::Starting, None);
    run_context
        .control_plane
        .push_state(ServerState::Running, Some(READY_ADDRESS));
    run_context
}

#[given("the scripted session returns exit code \"{code}\"")]
fn scripted_exit(run_context: RunContext, code: i32) -> RunContext {
    run_context.session.push_exit_code(code);
    run_context
}

#[given("the control plane fails to start servers")]
fn start_fails(run_context: RunContext) -> RunContext {
    run_context.control_plane.fail_on_start();
    run_context
}

#[given("a server that boots into a terminal failure state")]
fn terminal_boot(run_context: RunContext) -> RunContext {
    run_context
        .control_plane
        .repeat_state(ServerState::Error, None);
    run_context
}

#[when("I execute the run workflow for \"{command}\"")]
fn execute_workflow(run_context: RunContext, command: String) -> Result<RunContext, StepError> {
    let args = command
        .split_whitespace()
        .map(str::to_owned)
        .collect::<Vec<_>>();
    run_with_args(run_context, &args)
}

#[when("I execute the run workflow with no command")]
fn execute_workflow_default(run_context: RunContext) -> Result<RunContext, StepError> {
    run_with_args(run_context, &[])
}

fn run_with_args(run_context: RunContext, command: &[String]) -> Result<RunContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Runtime(err.to_string()))?;
    let RunContext {
        control_plane,
        session,
        request,
        ..
    } = run_context;

    let workflow = RunWorkflow::with_poller(control_plane.clone(), session.clone(), poller());
    let result = runtime.block_on(async {
        workflow
            .execute(&request, command, &CancelToken::new())
            .await
    });

    let result_enum = match result {
        Ok(outcome) => RunResult::Success(outcome),
        Err(err) => RunResult::Failure(err.to_string()),
    };

    Ok(RunContext {
        control_plane,
        session,
        request,
        outcome: Some(result_enum),
    })
}

#[then("the run outcome exit code is \"{code}\"")]
fn outcome_exit_code(run_context: &RunContext, code: i32) -> Result<(), StepError> {
    let Some(result) = &run_context.outcome else {
        return Err(StepError::Assertion(String::from("missing outcome")));
    };

    match result {
        RunResult::Success(outcome) if outcome.exit_code == Some(code) => Ok(()),
        RunResult::Success(other) => Err(StepError::Assertion(format!(
            "expected exit code {code}, got {:?}",
            other.exit_code
        ))),
        RunResult::Failure(message) => Err(StepError::Assertion(format!(
            "expected success, got failure: {message}"
        ))),
    }
}

#[then("the session command is the fallback shell")]
fn session_ran_fallback(run_context: &RunContext) -> Result<(), StepError> {
    let invocations = run_context.session.invocations();
    let Some(invocation) = invocations.first() else {
        return Err(StepError::Assertion(String::from("no session was opened")));
    };

    if invocation.command == FALLBACK_SHELL {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected fallback shell, got: {}",
            invocation.command
        )))
    }
}

#[then("the run fails in the start phase")]
fn failed_in_start(run_context: &RunContext) -> Result<(), StepError> {
    expect_failure_containing(run_context, "failed to start server")
}

#[then("the run fails in the readiness phase")]
fn failed_in_readiness(run_context: &RunContext) -> Result<(), StepError> {
    expect_failure_containing(run_context, "failed while becoming ready")
}

#[then("no describe or session call was made")]
fn no_describe_or_session(run_context: &RunContext) -> Result<(), StepError> {
    if run_context.control_plane.describe_calls() != 0 {
        return Err(StepError::Assertion(String::from(
            "describe should not have been called",
        )));
    }
    assert_no_session(run_context)
}

#[then("no session call was made")]
fn no_session(run_context: &RunContext) -> Result<(), StepError> {
    assert_no_session(run_context)
}

fn assert_no_session(run_context: &RunContext) -> Result<(), StepError> {
    if run_context.session.invocations().is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(String::from(
            "no session should have been opened",
        )))
    }
}

fn expect_failure_containing(run_context: &RunContext, needle: &str) -> Result<(), StepError> {
    let Some(result) = &run_context.outcome else {
        return Err(StepError::Assertion(String::from("missing outcome")));
    };

    match result {
        RunResult::Failure(message) if message.contains(needle) => Ok(()),
        RunResult::Failure(message) => Err(StepError::Assertion(format!(
            "expected failure containing '{needle}', got: {message}"
        ))),
        RunResult::Success(outcome) => Err(StepError::Assertion(format!(
            "expected failure, got success: {outcome:?}"
        ))),
    }
}
