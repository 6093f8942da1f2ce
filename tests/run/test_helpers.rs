//! Shared fixtures for run BDD scenarios.

use std::time::Duration;

use rstest::fixture;
use skiff::test_support::{ManualClock, ScriptedControlPlane, ScriptedSession};
use skiff::{ProvisionRequest, ReadinessPoller, RunOutcome};

/// Address the scripted server reports once ready.
pub const READY_ADDRESS: &str = "51.15.207.8";

#[derive(Clone, Debug)]
pub struct RunContext {
    pub control_plane: ScriptedControlPlane,
    pub session: ScriptedSession,
    pub request: ProvisionRequest,
    pub outcome: Option<RunResult>,
}

#[derive(Clone, Debug)]
pub enum RunResult {
    Success(RunOutcome),
    Failure(String),
}

#[fixture]
pub fn run_context() -> RunContext {
    build_run_context()
}

pub fn build_run_context() -> RunContext {
    RunContext {
        control_plane: ScriptedControlPlane::new(),
        session: ScriptedSession::new(),
        request: request(),
        outcome: None,
    }
}

pub fn request() -> ProvisionRequest {
    ProvisionRequest::builder()
        .image("ubuntu-trusty")
        .build()
        .unwrap_or_else(|err| panic!("request fixture should be valid: {err}"))
}

pub fn poller() -> ReadinessPoller<ManualClock> {
    ReadinessPoller::with_clock(ManualClock::new())
        .with_poll_interval(Duration::from_secs(1))
        .with_wait_timeout(Duration::from_secs(5))
}
