//! Error types for the Scaleway control plane.

use crate::config::ConfigError;
use crate::request::RequestError;
use scaleway_rs::ScalewayError;
use thiserror::Error;

/// Errors raised by the Scaleway control plane.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScalewayClientError {
    /// Raised when the high-level configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when a provisioning request fails validation.
    #[error("invalid provision request: {0}")]
    Validation(String),
    /// Raised when the requested image label cannot be resolved.
    #[error("image '{label}' (arch {arch}) not found in zone {zone}")]
    ImageNotFound {
        /// Image label passed by the caller.
        label: String,
        /// Architecture requested by the caller.
        arch: String,
        /// Zone used for the lookup.
        zone: String,
    },
    /// Raised when the server type is not available in the selected zone.
    #[error("instance type '{instance_type}' not available in zone {zone}")]
    InstanceTypeUnavailable {
        /// Requested commercial type.
        instance_type: String,
        /// Target zone.
        zone: String,
    },
    /// Raised when a described server is no longer visible in the API.
    #[error("server {server_id} not found in zone {zone}")]
    ServerNotFound {
        /// Provider server identifier.
        server_id: String,
        /// Zone used for the lookup.
        zone: String,
    },
    /// Raised when an additional volume size cannot be parsed.
    #[error("invalid volume size '{value}': expected a number with an optional M/G/T suffix")]
    InvalidVolumeSize {
        /// Size string passed by the caller.
        value: String,
    },
    /// Wrapper for provider level failures.
    #[error("provider error: {message}")]
    Provider {
        /// Message returned by the provider SDK.
        message: String,
    },
}

impl From<ScalewayError> for ScalewayClientError {
    fn from(value: ScalewayError) -> Self {
        Self::Provider {
            message: value.to_string(),
        }
    }
}

impl From<RequestError> for ScalewayClientError {
    fn from(value: RequestError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<ConfigError> for ScalewayClientError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
