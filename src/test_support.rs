//! Test support utilities shared across unit and integration tests.
//!
//! Scripted doubles stand in for the control plane and the remote-shell
//! transport so workflow scenarios run deterministically, and the manual
//! clock removes wall-clock sleeps from polling tests.

use std::collections::VecDeque;
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::control_plane::{
    ClientFuture, ControlPlaneClient, ServerHandle, ServerSnapshot, ServerState,
};
use crate::executor::{CommandRunner, ExecError, RemoteExecutor, RemoteStatus};
use crate::poller::{Clock, SleepFuture};
use crate::request::ProvisionRequest;

/// Identifier returned by [`ScriptedControlPlane`] for created servers.
pub const SCRIPTED_SERVER_ID: &str = "scripted-server";
/// Zone returned by [`ScriptedControlPlane`] for created servers.
pub const SCRIPTED_ZONE: &str = "test-zone";

/// Scripted control plane returning pre-seeded snapshots in FIFO order.
#[derive(Clone, Debug, Default)]
pub struct ScriptedControlPlane {
    state: Arc<Mutex<ControlPlaneState>>,
}

#[derive(Debug, Default)]
struct ControlPlaneState {
    fail_on_create: bool,
    fail_on_start: bool,
    fail_on_describe: bool,
    create_calls: u32,
    start_calls: u32,
    describe_calls: u32,
    snapshots: VecDeque<ServerSnapshot>,
    repeat: Option<ServerSnapshot>,
}

/// Errors returned by [`ScriptedControlPlane`].
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum ScriptedControlPlaneError {
    /// Scripted creation failure.
    #[error("scripted create failure")]
    Create,
    /// Scripted boot-trigger failure.
    #[error("scripted start failure")]
    Start,
    /// Scripted describe failure, also returned when no snapshot was
    /// seeded.
    #[error("scripted describe failure")]
    Describe,
}

fn scripted_snapshot(state: ServerState, public_address: Option<&str>) -> ServerSnapshot {
    ServerSnapshot {
        id: String::from(SCRIPTED_SERVER_ID),
        state,
        public_address: public_address.map(str::to_owned),
    }
}

impl ScriptedControlPlane {
    /// Creates a control plane with no scripted snapshots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ControlPlaneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next create call fail.
    pub fn fail_on_create(&self) {
        self.lock().fail_on_create = true;
    }

    /// Makes the next start call fail.
    pub fn fail_on_start(&self) {
        self.lock().fail_on_start = true;
    }

    /// Makes describe calls fail.
    pub fn fail_on_describe(&self) {
        self.lock().fail_on_describe = true;
    }

    /// Queues a snapshot with the given state and optional address.
    pub fn push_state(&self, state: ServerState, public_address: Option<&str>) {
        self.lock()
            .snapshots
            .push_back(scripted_snapshot(state, public_address));
    }

    /// Returns the given snapshot for every describe call once the queue
    /// is drained.
    pub fn repeat_state(&self, state: ServerState, public_address: Option<&str>) {
        self.lock().repeat = Some(scripted_snapshot(state, public_address));
    }

    /// Number of create calls made so far.
    #[must_use]
    pub fn create_calls(&self) -> u32 {
        self.lock().create_calls
    }

    /// Number of start calls made so far.
    #[must_use]
    pub fn start_calls(&self) -> u32 {
        self.lock().start_calls
    }

    /// Number of describe calls made so far.
    #[must_use]
    pub fn describe_calls(&self) -> u32 {
        self.lock().describe_calls
    }
}

impl ControlPlaneClient for ScriptedControlPlane {
    type Error = ScriptedControlPlaneError;

    fn create<'a>(
        &'a self,
        _request: &'a ProvisionRequest,
    ) -> ClientFuture<'a, ServerHandle, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.create_calls += 1;
            if state.fail_on_create {
                return Err(ScriptedControlPlaneError::Create);
            }
            Ok(ServerHandle {
                id: String::from(SCRIPTED_SERVER_ID),
                zone: String::from(SCRIPTED_ZONE),
            })
        })
    }

    fn start<'a>(&'a self, _handle: &'a ServerHandle) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.start_calls += 1;
            if state.fail_on_start {
                return Err(ScriptedControlPlaneError::Start);
            }
            Ok(())
        })
    }

    fn describe<'a>(
        &'a self,
        _handle: &'a ServerHandle,
    ) -> ClientFuture<'a, ServerSnapshot, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.describe_calls += 1;
            if state.fail_on_describe {
                return Err(ScriptedControlPlaneError::Describe);
            }
            if let Some(snapshot) = state.snapshots.pop_front() {
                return Ok(snapshot);
            }
            state
                .repeat
                .clone()
                .ok_or(ScriptedControlPlaneError::Describe)
        })
    }
}

/// Records a single remote session request made through
/// [`ScriptedSession`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionInvocation {
    /// Address the session targeted.
    pub address: String,
    /// Command line passed to the session.
    pub command: String,
    /// Whether a tty was requested.
    pub interactive: bool,
}

/// Errors returned by [`ScriptedSession`].
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum ScriptedSessionError {
    /// Scripted session-establishment failure.
    #[error("scripted session failure")]
    Session,
    /// Raised when a session runs without a seeded result.
    #[error("no scripted session result available")]
    Unscripted,
}

/// Scripted remote executor returning pre-seeded results in FIFO order.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSession {
    state: Arc<Mutex<SessionState>>,
}

#[derive(Debug, Default)]
struct SessionState {
    results: VecDeque<Result<RemoteStatus, ScriptedSessionError>>,
    invocations: Vec<SessionInvocation>,
}

impl ScriptedSession {
    /// Creates a session double with no queued results.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a session that finishes with the given exit code.
    pub fn push_exit_code(&self, code: i32) {
        self.lock()
            .results
            .push_back(Ok(RemoteStatus { code: Some(code) }));
    }

    /// Queues a session that finishes without an exit status.
    pub fn push_missing_exit_code(&self) {
        self.lock().results.push_back(Ok(RemoteStatus { code: None }));
    }

    /// Queues a session-establishment failure.
    pub fn push_session_failure(&self) {
        self.lock()
            .results
            .push_back(Err(ScriptedSessionError::Session));
    }

    /// Returns a snapshot of all session requests recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<SessionInvocation> {
        self.lock().invocations.clone()
    }
}

impl RemoteExecutor for ScriptedSession {
    type Error = ScriptedSessionError;

    fn run(
        &self,
        address: &str,
        command: &str,
        interactive: bool,
    ) -> Result<RemoteStatus, Self::Error> {
        let mut state = self.lock();
        state.invocations.push(SessionInvocation {
            address: address.to_owned(),
            command: command.to_owned(),
            interactive,
        });
        match state.results.pop_front() {
            Some(result) => result,
            None => Err(ScriptedSessionError::Unscripted),
        }
    }
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

/// Scripted command runner that returns pre-seeded statuses in FIFO order.
///
/// Used to drive deterministic transport outcomes without spawning
/// processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: std::rc::Rc<std::cell::RefCell<VecDeque<RemoteStatus>>>,
    invocations: std::rc::Rc<std::cell::RefCell<Vec<CommandInvocation>>>,
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a specific exit code.
    pub fn push_exit_code(&self, code: i32) {
        self.responses
            .borrow_mut()
            .push_back(RemoteStatus { code: Some(code) });
    }

    /// Pushes a response with no exit code to simulate abnormal
    /// termination.
    pub fn push_missing_exit_code(&self) {
        self.responses
            .borrow_mut()
            .push_back(RemoteStatus { code: None });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<RemoteStatus, ExecError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ExecError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Manually advanced clock for deterministic polling tests.
///
/// `sleep` advances the clock instantly instead of suspending the task.
#[derive(Clone, Debug)]
pub struct ManualClock {
    state: Arc<Mutex<ManualClockState>>,
}

#[derive(Debug)]
struct ManualClockState {
    start: Instant,
    now: Instant,
}

impl ManualClock {
    /// Creates a clock anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        let start = Instant::now();
        Self {
            state: Arc::new(Mutex::new(ManualClockState { start, now: start })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total simulated time slept so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        let state = self.lock();
        state.now.duration_since(state.start)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.lock().now
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        let mut state = self.lock();
        state.now += duration;
        drop(state);
        Box::pin(std::future::ready(()))
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and cleans up variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets a single environment variable while holding a global mutex.
    pub async fn set_var(key: &str, value: &str) -> Self {
        Self::set_vars(&[(key, value)]).await
    }

    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`,
            // preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding
            // `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
