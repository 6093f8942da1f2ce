//! Control-plane abstraction for managing server instances.
//!
//! The workflow consumes exactly three semantic operations — create,
//! start, and describe — so the trait stays at that boundary and hides
//! every provider-specific request or response shape behind it.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::request::ProvisionRequest;

/// Handle returned by the control plane once a server has been created.
///
/// The identifier is opaque and immutable; the zone travels with it because
/// every subsequent provider call is zone-scoped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerHandle {
    /// Provider specific identifier for the server.
    pub id: String,
    /// Zone in which the server was created.
    pub zone: String,
}

/// Lifecycle state reported by the provider for a server.
///
/// Providers define a superset of these states; anything unrecognised is
/// preserved verbatim in [`ServerState::Other`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ServerState {
    /// The creation request is accepted but the server is not yet booting.
    Pending,
    /// The server is booting.
    Starting,
    /// The server is up.
    Running,
    /// The server is shutting down.
    Stopping,
    /// The server is powered off.
    Stopped,
    /// The provider reported a terminal failure.
    Error,
    /// Any other provider-defined state.
    Other(String),
}

impl ServerState {
    /// Parses a provider state string, preserving unknown values.
    #[must_use]
    pub fn from_provider(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "allocating" => Self::Pending,
            "starting" => Self::Starting,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            "stopped" | "stopped in place" => Self::Stopped,
            "error" => Self::Error,
            _ => Self::Other(value.to_owned()),
        }
    }

    /// Returns `true` when the server is up.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns `true` when the provider reported a terminal failure and
    /// further polling is pointless.
    #[must_use]
    pub const fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Starting => f.write_str("starting"),
            Self::Running => f.write_str("running"),
            Self::Stopping => f.write_str("stopping"),
            Self::Stopped => f.write_str("stopped"),
            Self::Error => f.write_str("error"),
            Self::Other(state) => f.write_str(state),
        }
    }
}

/// Point-in-time view of a server, produced fresh on each describe call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerSnapshot {
    /// Provider specific identifier for the server.
    pub id: String,
    /// Lifecycle state at the moment of the describe call.
    pub state: ServerState,
    /// Public network address, present only once network-attached.
    pub public_address: Option<String>,
}

impl ServerSnapshot {
    /// Returns the public address when the server is reachable: running
    /// with a non-empty address. A running server without an address is
    /// not yet reachable.
    #[must_use]
    pub fn ready_address(&self) -> Option<&str> {
        if !self.state.is_running() {
            return None;
        }
        self.public_address
            .as_deref()
            .filter(|address| !address.is_empty())
    }
}

/// Future returned by control-plane operations.
pub type ClientFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Minimal interface implemented by cloud control planes.
pub trait ControlPlaneClient {
    /// Provider specific error type returned by the client.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates a new server and returns a handle used for subsequent calls.
    fn create<'a>(
        &'a self,
        request: &'a ProvisionRequest,
    ) -> ClientFuture<'a, ServerHandle, Self::Error>;

    /// Triggers the boot of a created server.
    fn start<'a>(&'a self, handle: &'a ServerHandle) -> ClientFuture<'a, (), Self::Error>;

    /// Reads the current state of a server.
    fn describe<'a>(
        &'a self,
        handle: &'a ServerHandle,
    ) -> ClientFuture<'a, ServerSnapshot, Self::Error>;
}
