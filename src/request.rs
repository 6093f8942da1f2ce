//! Provisioning parameters for a new server instance.

use thiserror::Error;

/// Validated parameters for creating a new server.
///
/// Only the boot image is mandatory; every other field falls back to the
/// provider's defaults when absent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionRequest {
    /// Image to boot the server from. Either a provider image identifier or
    /// a human readable label the control plane resolves.
    pub image: String,
    /// Optional display name for the server.
    pub name: Option<String>,
    /// Optional bootscript reference applied at boot.
    pub bootscript: Option<String>,
    /// Boot-time environment tags passed to the initrd, in caller order.
    /// Each entry is a `KEY=VALUE` pair.
    pub env_tags: Vec<String>,
    /// Optional additional volume size (for example `50GB`), attached
    /// alongside the root volume.
    pub extra_volume: Option<String>,
}

impl ProvisionRequest {
    /// Starts a builder for a [`ProvisionRequest`].
    #[must_use]
    pub fn builder() -> ProvisionRequestBuilder {
        ProvisionRequestBuilder::new()
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] when the image reference is
    /// empty, or [`RequestError::MalformedTag`] when an environment tag is
    /// not a `KEY=VALUE` pair.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.image.is_empty() {
            return Err(RequestError::Validation("image".to_owned()));
        }
        for tag in &self.env_tags {
            if tag.is_empty() || !tag.contains('=') {
                return Err(RequestError::MalformedTag { tag: tag.clone() });
            }
        }
        Ok(())
    }
}

/// Builder for [`ProvisionRequest`] that defers trimming and validation to
/// construction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProvisionRequestBuilder {
    image: String,
    name: Option<String>,
    bootscript: Option<String>,
    env_tags: Vec<String>,
    extra_volume: Option<String>,
}

impl ProvisionRequestBuilder {
    /// Creates an empty builder; the image must be populated before build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the boot image reference.
    #[must_use]
    pub fn image(mut self, value: impl Into<String>) -> Self {
        self.image = value.into();
        self
    }

    /// Sets the optional display name.
    #[must_use]
    pub fn name(mut self, value: Option<String>) -> Self {
        self.name = value;
        self
    }

    /// Sets the optional bootscript reference.
    #[must_use]
    pub fn bootscript(mut self, value: Option<String>) -> Self {
        self.bootscript = value;
        self
    }

    /// Sets the boot-time environment tags, preserving order.
    #[must_use]
    pub fn env_tags(mut self, value: impl IntoIterator<Item = String>) -> Self {
        self.env_tags = value.into_iter().collect();
        self
    }

    /// Sets the optional additional volume size.
    #[must_use]
    pub fn extra_volume(mut self, value: Option<String>) -> Self {
        self.extra_volume = value;
        self
    }

    /// Builds and validates the [`ProvisionRequest`], trimming string
    /// inputs. Optional fields that trim to empty are dropped so provider
    /// defaults apply.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] when the image reference is
    /// empty, or [`RequestError::MalformedTag`] for tags without a `=`.
    pub fn build(self) -> Result<ProvisionRequest, RequestError> {
        let request = ProvisionRequest {
            image: self.image.trim().to_owned(),
            name: normalise(self.name),
            bootscript: normalise(self.bootscript),
            env_tags: self
                .env_tags
                .into_iter()
                .map(|tag| tag.trim().to_owned())
                .collect(),
            extra_volume: normalise(self.extra_volume),
        };
        request.validate()?;
        Ok(request)
    }
}

fn normalise(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

/// Errors raised while constructing a provisioning request.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum RequestError {
    /// Raised when a required field is missing or empty.
    #[error("missing or empty field: {0}")]
    Validation(String),
    /// Raised when an environment tag is not a `KEY=VALUE` pair.
    #[error("malformed environment tag '{tag}': expected KEY=VALUE")]
    MalformedTag {
        /// Offending tag as passed by the caller.
        tag: String,
    },
}
