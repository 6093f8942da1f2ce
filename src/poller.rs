//! Readiness polling for booting servers.
//!
//! Converts the asynchronous boot of a server into a synchronous "ready"
//! signal by repeatedly describing it until it is running with a public
//! address, the provider reports a terminal failure, or a deadline passes.
//! Time is injected through [`Clock`] so tests never wait on the wall
//! clock.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::control_plane::{ControlPlaneClient, ServerHandle, ServerSnapshot, ServerState};

/// Default delay between describe calls. Kept well above one second so a
/// slow boot does not hammer the control plane.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Default bound on the total time spent waiting for readiness.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Future returned by [`Clock::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Time source used by the poller.
///
/// Production code uses [`TokioClock`]; tests substitute a manual clock
/// that advances instantly.
pub trait Clock {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Sleeps for the given duration.
    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// Tokio-backed clock used in production.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Decision taken for a single snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Readiness {
    /// The server is running with the given public address.
    Ready(String),
    /// The server is still booting; keep polling.
    NotYet,
    /// The provider reported a terminal state; stop polling.
    Failed(ServerState),
}

/// Classifies a snapshot. `Ready` is returned only when the lifecycle
/// state is running **and** a non-empty public address is present.
#[must_use]
pub fn assess(snapshot: &ServerSnapshot) -> Readiness {
    if snapshot.state.is_terminal_failure() {
        return Readiness::Failed(snapshot.state.clone());
    }
    snapshot
        .ready_address()
        .map_or(Readiness::NotYet, |address| {
            Readiness::Ready(address.to_owned())
        })
}

/// Snapshot taken at the moment readiness was confirmed, with the public
/// address it carried.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadyServer {
    /// Public address the server is reachable on.
    pub address: String,
    /// Snapshot that confirmed readiness.
    pub snapshot: ServerSnapshot,
}

/// Errors raised by the wait loop.
#[derive(Debug, Error)]
pub enum PollError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised when the server never became reachable within the bound.
    #[error("server {server_id} did not become ready within {} seconds", .waited.as_secs())]
    Timeout {
        /// Provider server identifier.
        server_id: String,
        /// Configured wait bound.
        waited: Duration,
    },
    /// Raised when the provider reported a terminal failure state.
    #[error("server {server_id} entered terminal state '{state}' while booting")]
    Failed {
        /// Provider server identifier.
        server_id: String,
        /// Terminal state reported by the provider.
        state: ServerState,
    },
    /// Raised when a describe call itself fails.
    #[error("failed to describe server: {0}")]
    Describe(#[source] E),
}

/// Polls a server until it is reachable or the wait terminates.
///
/// The loop is a blocking wait-with-timeout on the calling task; no
/// concurrent pollers run for the same handle.
#[derive(Clone, Debug)]
pub struct ReadinessPoller<K: Clock = TokioClock> {
    clock: K,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl ReadinessPoller<TokioClock> {
    /// Creates a poller with the production clock and default tuning.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_clock(TokioClock)
    }
}

impl Default for ReadinessPoller<TokioClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clock> ReadinessPoller<K> {
    /// Creates a poller with the given clock and default tuning.
    #[must_use]
    pub const fn with_clock(clock: K) -> Self {
        Self {
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    /// Overrides the delay between describe calls.
    ///
    /// This is primarily used by tests to keep timeout scenarios fast;
    /// production callers should not poll faster than roughly once per
    /// second.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the bound on the total wait time.
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Polls `handle` until it is reachable and returns the confirming
    /// snapshot with its public address.
    ///
    /// The deadline is never overshot by more than one polling interval: a
    /// final describe is made at the deadline, then the wait times out.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Failed`] as soon as the provider reports a
    /// terminal state, [`PollError::Timeout`] when the bound elapses, or
    /// [`PollError::Describe`] when a describe call fails.
    pub async fn wait_ready<C>(
        &self,
        client: &C,
        handle: &ServerHandle,
    ) -> Result<ReadyServer, PollError<C::Error>>
    where
        C: ControlPlaneClient,
    {
        let deadline = self.clock.now() + self.wait_timeout;
        loop {
            let snapshot = client
                .describe(handle)
                .await
                .map_err(PollError::Describe)?;

            match assess(&snapshot) {
                Readiness::Ready(address) => return Ok(ReadyServer { address, snapshot }),
                Readiness::Failed(state) => {
                    return Err(PollError::Failed {
                        server_id: handle.id.clone(),
                        state,
                    });
                }
                Readiness::NotYet => {}
            }

            if self.clock.now() >= deadline {
                return Err(PollError::Timeout {
                    server_id: handle.id.clone(),
                    waited: self.wait_timeout,
                });
            }
            self.clock.sleep(self.poll_interval).await;
        }
    }
}
