//! Core library for the Skiff remote provisioning tool.
//!
//! The crate exposes a single-shot workflow that allocates a fresh cloud
//! server from an image, boots it, waits until it is reachable, and runs a
//! command on it over SSH (create → start → await readiness → execute).
//! The control plane and the remote-shell transport are abstracted behind
//! traits with one production implementation each, so the workflow can be
//! driven deterministically in tests.

pub mod config;
pub mod control_plane;
pub mod executor;
pub mod poller;
pub mod request;
pub mod scaleway;
pub mod test_support;
pub mod workflow;

pub use config::{ConfigError, ScalewayConfig};
pub use control_plane::{
    ClientFuture, ControlPlaneClient, ServerHandle, ServerSnapshot, ServerState,
};
pub use executor::{
    CommandRunner, ExecError, RemoteExecutor, RemoteStatus, SshConfig, SshExecutor,
    StreamingProcessRunner,
};
pub use poller::{Clock, PollError, Readiness, ReadinessPoller, ReadyServer, TokioClock};
pub use request::{ProvisionRequest, ProvisionRequestBuilder, RequestError};
pub use scaleway::{ScalewayClientError, ScalewayControlPlane};
pub use workflow::{CancelToken, FALLBACK_SHELL, Phase, RunError, RunOutcome, RunWorkflow};
