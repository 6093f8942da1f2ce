//! Server creation helpers for the Scaleway control plane.
//!
//! Creation uses a raw JSON request rather than the SDK builder because
//! the bootscript and additional-volume fields are not exposed there. The
//! server is created with `stopped: true`; powering it on is the separate
//! start phase.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::request::ProvisionRequest;

use super::{HTTP_CLIENT, SCALEWAY_INSTANCE_API_BASE, ScalewayClientError, ScalewayControlPlane};

#[derive(Debug, Serialize)]
pub(in crate::scaleway) struct CreateServerRequest {
    pub(in crate::scaleway) name: String,
    pub(in crate::scaleway) commercial_type: String,
    pub(in crate::scaleway) image: String,
    pub(in crate::scaleway) project: String,
    pub(in crate::scaleway) routed_ip_enabled: bool,
    pub(in crate::scaleway) dynamic_ip_required: bool,
    pub(in crate::scaleway) tags: Vec<String>,
    pub(in crate::scaleway) stopped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(in crate::scaleway) bootscript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(in crate::scaleway) organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(in crate::scaleway) volumes: Option<HashMap<String, VolumeSpec>>,
}

#[derive(Debug, Serialize)]
pub(in crate::scaleway) struct VolumeSpec {
    pub(in crate::scaleway) size: u64,
    pub(in crate::scaleway) volume_type: String,
}

#[derive(Deserialize)]
struct CreateServerResponse {
    server: scaleway_rs::ScalewayInstance,
}

/// Size suffixes accepted for additional volumes, longest first so `GB`
/// wins over `B`.
const SIZE_SUFFIXES: [(&str, u64); 7] = [
    ("TB", 1_000_000_000_000),
    ("GB", 1_000_000_000),
    ("MB", 1_000_000),
    ("T", 1_000_000_000_000),
    ("G", 1_000_000_000),
    ("M", 1_000_000),
    ("B", 1),
];

/// Parses a human volume size such as `50GB` or `50G` into bytes.
pub(in crate::scaleway) fn parse_volume_size(value: &str) -> Result<u64, ScalewayClientError> {
    let text = value.trim().to_ascii_uppercase();
    for (suffix, multiplier) in SIZE_SUFFIXES {
        if let Some(digits) = text.strip_suffix(suffix) {
            return apply_multiplier(digits, multiplier, value);
        }
    }
    apply_multiplier(&text, 1, value)
}

fn apply_multiplier(
    digits: &str,
    multiplier: u64,
    original: &str,
) -> Result<u64, ScalewayClientError> {
    let count: u64 = digits
        .trim()
        .parse()
        .map_err(|_| ScalewayClientError::InvalidVolumeSize {
            value: original.to_owned(),
        })?;
    count
        .checked_mul(multiplier)
        .ok_or_else(|| ScalewayClientError::InvalidVolumeSize {
            value: original.to_owned(),
        })
}

impl ScalewayControlPlane {
    pub(in crate::scaleway) fn is_instance_type_error(
        api_err: &scaleway_rs::ScalewayApiError,
        instance_type: &str,
    ) -> bool {
        matches!(api_err.resource.as_deref(), Some("commercial_type"))
            || api_err
                .resource_id
                .as_deref()
                .is_some_and(|id| id == instance_type)
            || (api_err.etype == "invalid_arguments"
                && api_err
                    .message
                    .to_ascii_lowercase()
                    .contains("commercial_type"))
    }

    pub(in crate::scaleway) fn build_create_payload(
        &self,
        request: &ProvisionRequest,
        image_id: &str,
    ) -> Result<CreateServerRequest, ScalewayClientError> {
        let name = request
            .name
            .clone()
            .unwrap_or_else(|| format!("skiff-{}", Uuid::new_v4().simple()));

        let volumes = request
            .extra_volume
            .as_deref()
            .map(parse_volume_size)
            .transpose()?
            .map(|size| {
                HashMap::from([(
                    String::from("1"),
                    VolumeSpec {
                        size,
                        volume_type: String::from("l_ssd"),
                    },
                )])
            });

        Ok(CreateServerRequest {
            name,
            commercial_type: self.config.default_instance_type.clone(),
            image: image_id.to_owned(),
            project: self.config.default_project_id.clone(),
            routed_ip_enabled: true,
            dynamic_ip_required: true,
            tags: request.env_tags.clone(),
            stopped: true,
            bootscript: request.bootscript.clone(),
            organization: self.config.default_organization_id.clone(),
            volumes,
        })
    }

    /// Creates a server in a stopped state and returns the provider record.
    ///
    /// # Errors
    ///
    /// Returns [`ScalewayClientError`] when the API request fails or the
    /// provider rejects the requested instance type or image.
    pub(in crate::scaleway) async fn create_server(
        &self,
        request: &ProvisionRequest,
        image_id: &str,
    ) -> Result<scaleway_rs::ScalewayInstance, ScalewayClientError> {
        let url = format!(
            "{}/zones/{}/servers",
            SCALEWAY_INSTANCE_API_BASE, self.config.default_zone
        );
        let payload = self.build_create_payload(request, image_id)?;

        let response = HTTP_CLIENT
            .post(&url)
            .header("X-Auth-Token", &self.config.secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| ScalewayClientError::Provider {
                message: err.to_string(),
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| ScalewayClientError::Provider {
                message: err.to_string(),
            })?;

        if status.is_success() {
            let parsed: CreateServerResponse =
                serde_json::from_slice(&body).map_err(|err| ScalewayClientError::Provider {
                    message: err.to_string(),
                })?;
            return Ok(parsed.server);
        }

        let message = String::from_utf8_lossy(&body).into_owned();
        if let Ok(api_err) = serde_json::from_slice::<scaleway_rs::ScalewayApiError>(&body)
            && Self::is_instance_type_error(&api_err, &self.config.default_instance_type)
        {
            return Err(ScalewayClientError::InstanceTypeUnavailable {
                instance_type: self.config.default_instance_type.clone(),
                zone: self.config.default_zone.clone(),
            });
        }

        Err(ScalewayClientError::Provider { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScalewayConfig;

    fn dummy_config() -> ScalewayConfig {
        ScalewayConfig {
            access_key: None,
            secret_key: String::from("dummy"),
            default_organization_id: None,
            default_project_id: String::from("proj"),
            default_zone: String::from("fr-par-1"),
            default_instance_type: String::from("DEV1-S"),
            default_architecture: String::from("x86_64"),
        }
    }

    fn control_plane() -> ScalewayControlPlane {
        ScalewayControlPlane::new(dummy_config())
            .unwrap_or_else(|err| panic!("config fixture should be valid: {err}"))
    }

    fn request() -> ProvisionRequest {
        ProvisionRequest::builder()
            .image("ubuntu-noble")
            .build()
            .unwrap_or_else(|err| panic!("request fixture should be valid: {err}"))
    }

    #[tokio::test]
    async fn create_rejects_invalid_requests_before_any_provider_call() {
        use crate::control_plane::ControlPlaneClient;

        let bad_request = ProvisionRequest {
            image: String::new(),
            name: None,
            bootscript: None,
            env_tags: Vec::new(),
            extra_volume: None,
        };

        let err = control_plane()
            .create(&bad_request)
            .await
            .expect_err("empty image should fail validation");
        assert!(matches!(err, ScalewayClientError::Validation(_)));
    }

    #[test]
    fn parse_volume_size_accepts_suffixes() {
        let cases = [
            ("50GB", 50_000_000_000_u64),
            ("50G", 50_000_000_000),
            ("512MB", 512_000_000),
            ("1T", 1_000_000_000_000),
            ("1024", 1024),
        ];
        for (text, expected) in cases {
            let parsed = parse_volume_size(text)
                .unwrap_or_else(|err| panic!("'{text}' should parse: {err}"));
            assert_eq!(parsed, expected, "input: {text}");
        }
    }

    #[test]
    fn parse_volume_size_rejects_garbage() {
        for text in ["", "GB", "fifty", "50XB", "-1G"] {
            let err = parse_volume_size(text).expect_err("parse should fail");
            assert!(
                matches!(err, ScalewayClientError::InvalidVolumeSize { ref value } if value == text),
                "input: {text}"
            );
        }
    }

    #[test]
    fn build_create_payload_generates_name_when_absent() {
        let payload = control_plane()
            .build_create_payload(&request(), "image-id")
            .unwrap_or_else(|err| panic!("payload should build: {err}"));

        assert!(payload.name.starts_with("skiff-"), "name: {}", payload.name);
        assert!(payload.stopped);
        assert!(payload.volumes.is_none());
        assert!(payload.bootscript.is_none());
    }

    #[test]
    fn build_create_payload_passes_caller_fields_through() {
        let caller_request = ProvisionRequest::builder()
            .image("ubuntu-noble")
            .name(Some(String::from("mydocker")))
            .bootscript(Some(String::from("3.2.34")))
            .env_tags([String::from("boot=live"), String::from("INITRD_DEBUG=1")])
            .extra_volume(Some(String::from("50GB")))
            .build()
            .unwrap_or_else(|err| panic!("request fixture should be valid: {err}"));

        let payload = control_plane()
            .build_create_payload(&caller_request, "image-id")
            .unwrap_or_else(|err| panic!("payload should build: {err}"));

        assert_eq!(payload.name, "mydocker");
        assert_eq!(payload.bootscript.as_deref(), Some("3.2.34"));
        assert_eq!(
            payload.tags,
            vec![String::from("boot=live"), String::from("INITRD_DEBUG=1")]
        );
        let volumes = payload
            .volumes
            .unwrap_or_else(|| panic!("volume should be present"));
        let spec = volumes
            .get("1")
            .unwrap_or_else(|| panic!("volume slot 1 should be present"));
        assert_eq!(spec.size, 50_000_000_000);
        assert_eq!(spec.volume_type, "l_ssd");
    }

    #[test]
    fn build_create_payload_serialises_without_null_optionals() {
        let payload = control_plane()
            .build_create_payload(&request(), "image-id")
            .unwrap_or_else(|err| panic!("payload should build: {err}"));
        let json = serde_json::to_value(&payload)
            .unwrap_or_else(|err| panic!("payload should serialise: {err}"));

        let object = json
            .as_object()
            .unwrap_or_else(|| panic!("payload should be an object"));
        assert!(!object.contains_key("bootscript"));
        assert!(!object.contains_key("volumes"));
        assert!(!object.contains_key("organization"));
        assert_eq!(
            object.get("commercial_type").and_then(|v| v.as_str()),
            Some("DEV1-S")
        );
    }
}
