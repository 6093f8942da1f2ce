//! Orchestrates the provision → boot → execute workflow.
//!
//! The workflow drives the control plane to create and start a server,
//! hands the resulting handle to the readiness poller, and on success runs
//! the caller's command on the server's public address. Remote exit codes
//! are preserved so callers observe the same status locally; workflow-level
//! failures carry the phase and the handle or address involved. No phase is
//! retried, and a failed run leaves the created server in place — teardown
//! is a separate, explicit operation upstream.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use shell_escape::unix::escape;
use thiserror::Error;

use crate::control_plane::ControlPlaneClient;
use crate::executor::RemoteExecutor;
use crate::poller::{Clock, PollError, ReadinessPoller, TokioClock};
use crate::request::ProvisionRequest;

/// Remote-side fallback used when no command is given: prefer a
/// full-featured shell, fall back to a minimal one. The choice is made on
/// the server rather than negotiated beforehand.
pub const FALLBACK_SHELL: &str = "if [ -x /bin/bash ]; then /bin/bash; else /bin/sh; fi";

/// Workflow phase, used for cancellation points and error context.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Server creation.
    Create,
    /// Boot trigger.
    Start,
    /// Readiness wait.
    AwaitReady,
    /// Remote execution.
    Execute,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Start => f.write_str("start"),
            Self::AwaitReady => f.write_str("await-ready"),
            Self::Execute => f.write_str("execute"),
        }
    }
}

/// Cooperative cancellation flag checked at phase boundaries.
///
/// Mid-poll or mid-execution cancellation is the responsibility of the
/// underlying transport, not this workflow.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; the workflow stops before its next phase.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Terminal result of a successful run: the remote command's exit status.
///
/// A non-zero status is the user's command failing, surfaced verbatim — it
/// is not a workflow failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunOutcome {
    /// Exit status of the remote command, if one was reported.
    pub exit_code: Option<i32>,
}

/// Errors surfaced while performing a run. Every variant is fatal to the
/// workflow; remaining phases are skipped.
#[derive(Debug, Error)]
pub enum RunError<C, X>
where
    C: std::error::Error + 'static,
    X: std::error::Error + 'static,
{
    /// Raised when the control plane rejects server creation.
    #[error("failed to create server: {0}")]
    Provision(#[source] C),
    /// Raised when the boot trigger is rejected. The created server is
    /// left in place.
    #[error("failed to start server {server_id}")]
    Start {
        /// Identifier of the server that could not be started.
        server_id: String,
        /// Provider-specific error.
        #[source]
        source: C,
    },
    /// Raised when the server never became reachable within the bound.
    #[error("server {server_id} did not become ready within {} seconds", .waited.as_secs())]
    ReadinessTimeout {
        /// Identifier of the server that never became ready.
        server_id: String,
        /// Configured wait bound.
        waited: Duration,
    },
    /// Raised when the boot wait failed before the bound: the provider
    /// reported a terminal state, or a describe call failed.
    #[error("server {server_id} failed while becoming ready")]
    Readiness {
        /// Identifier of the failed server.
        server_id: String,
        /// Underlying poll failure.
        #[source]
        source: PollError<C>,
    },
    /// Raised when the remote session could not be established.
    #[error("remote execution on {address} failed to start")]
    Execution {
        /// Address the session targeted.
        address: String,
        /// Transport-specific error.
        #[source]
        source: X,
    },
    /// Raised when cancellation was requested at a phase boundary.
    #[error("run cancelled before {phase} phase")]
    Cancelled {
        /// Phase that was about to begin.
        phase: Phase,
    },
}

/// Renders the remote command line from caller arguments.
///
/// An empty argument list substitutes the [`FALLBACK_SHELL`] script;
/// otherwise each argument is shell-escaped and the list joined with
/// spaces.
#[must_use]
pub fn render_command(args: &[String]) -> String {
    if args.is_empty() {
        return FALLBACK_SHELL.to_owned();
    }

    let mut result = String::new();
    let mut first = true;
    for arg in args {
        if first {
            first = false;
        } else {
            result.push(' ');
        }
        let escaped = escape(arg.as_str().into());
        result.push_str(escaped.as_ref());
    }
    result
}

/// Executes the run workflow using the provided control plane and
/// executor.
///
/// Each invocation is independent and owns its own server; no state is
/// shared across runs.
#[derive(Clone, Debug)]
pub struct RunWorkflow<C, X, K: Clock = TokioClock> {
    client: C,
    executor: X,
    poller: ReadinessPoller<K>,
}

impl<C, X> RunWorkflow<C, X, TokioClock>
where
    C: ControlPlaneClient,
    X: RemoteExecutor,
{
    /// Creates a workflow with default readiness tuning.
    #[must_use]
    pub const fn new(client: C, executor: X) -> Self {
        Self {
            client,
            executor,
            poller: ReadinessPoller::new(),
        }
    }
}

impl<C, X, K> RunWorkflow<C, X, K>
where
    C: ControlPlaneClient,
    X: RemoteExecutor,
    K: Clock,
{
    /// Creates a workflow with a custom poller, primarily for tests that
    /// substitute a manual clock.
    #[must_use]
    pub const fn with_poller(client: C, executor: X, poller: ReadinessPoller<K>) -> Self {
        Self {
            client,
            executor,
            poller,
        }
    }

    /// Runs the four phases and returns the remote command's exit status.
    ///
    /// An empty `command` opens the remote fallback shell. The remote exit
    /// code is returned even when non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when creation, boot, the readiness wait, or
    /// session establishment fail, or when `cancel` fires at a phase
    /// boundary.
    pub async fn execute(
        &self,
        request: &ProvisionRequest,
        command: &[String],
        cancel: &CancelToken,
    ) -> Result<RunOutcome, RunError<C::Error, X::Error>> {
        ensure_live(Phase::Create, cancel)?;
        let handle = self
            .client
            .create(request)
            .await
            .map_err(RunError::Provision)?;

        ensure_live(Phase::Start, cancel)?;
        self.client
            .start(&handle)
            .await
            .map_err(|err| RunError::Start {
                server_id: handle.id.clone(),
                source: err,
            })?;

        ensure_live(Phase::AwaitReady, cancel)?;
        let ready = self
            .poller
            .wait_ready(&self.client, &handle)
            .await
            .map_err(|err| match err {
                PollError::Timeout { server_id, waited } => {
                    RunError::ReadinessTimeout { server_id, waited }
                }
                other => RunError::Readiness {
                    server_id: handle.id.clone(),
                    source: other,
                },
            })?;

        ensure_live(Phase::Execute, cancel)?;
        let command_line = render_command(command);
        let status = self
            .executor
            .run(&ready.address, &command_line, false)
            .map_err(|err| RunError::Execution {
                address: ready.address.clone(),
                source: err,
            })?;

        Ok(RunOutcome {
            exit_code: status.code,
        })
    }
}

fn ensure_live<C, X>(phase: Phase, cancel: &CancelToken) -> Result<(), RunError<C, X>>
where
    C: std::error::Error + 'static,
    X: std::error::Error + 'static,
{
    if cancel.is_cancelled() {
        return Err(RunError::Cancelled { phase });
    }
    Ok(())
}
