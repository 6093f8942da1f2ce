//! Image resolution helpers for the Scaleway control plane.
//!
//! Callers may pass either a provider image identifier or a human readable
//! label; labels resolve to the newest available image for the configured
//! architecture.

use scaleway_rs::{ScalewayImage, ScalewayListInstanceImagesBuilder};
use uuid::Uuid;

use super::{ScalewayClientError, ScalewayControlPlane};

impl ScalewayControlPlane {
    pub(in crate::scaleway) async fn resolve_image_id(
        &self,
        image: &str,
    ) -> Result<String, ScalewayClientError> {
        if Uuid::parse_str(image).is_ok() {
            return Ok(image.to_owned());
        }

        let images = ScalewayListInstanceImagesBuilder::new(
            self.api.clone(),
            &self.config.default_zone,
        )
        .public(true)
        .name(image)
        .arch(&self.config.default_architecture)
        .run_async()
        .await
        .map_err(ScalewayClientError::from)?;

        let candidates = self.filter_images(images);
        self.select_image_id(candidates, image)
    }

    pub(in crate::scaleway) fn filter_images(&self, images: Vec<ScalewayImage>) -> Vec<ScalewayImage> {
        images
            .into_iter()
            .filter(|image| image.arch == self.config.default_architecture)
            .filter(|image| image.state == "available")
            .collect()
    }

    pub(in crate::scaleway) fn select_image_id(
        &self,
        mut candidates: Vec<ScalewayImage>,
        label: &str,
    ) -> Result<String, ScalewayClientError> {
        if candidates.is_empty() {
            return Err(ScalewayClientError::ImageNotFound {
                label: label.to_owned(),
                arch: self.config.default_architecture.clone(),
                zone: self.config.default_zone.clone(),
            });
        }
        candidates.sort_by(|lhs, rhs| rhs.creation_date.cmp(&lhs.creation_date));
        Ok(candidates.remove(0).id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::ScalewayConfig;

    #[derive(Copy, Clone)]
    struct ImageSpec {
        id: &'static str,
        arch: &'static str,
        state: &'static str,
        creation_date: &'static str,
    }

    fn image(spec: ImageSpec) -> ScalewayImage {
        ScalewayImage {
            id: spec.id.to_owned(),
            name: String::new(),
            arch: spec.arch.to_owned(),
            creation_date: spec.creation_date.to_owned(),
            modification_date: String::new(),
            from_server: None,
            organization: String::new(),
            public: true,
            state: spec.state.to_owned(),
            project: String::new(),
            tags: vec![],
            zone: String::new(),
            root_volume: scaleway_rs::ScalewayImageRootVolume {
                id: String::new(),
                name: String::new(),
                size: 0,
                volume_type: String::new(),
            },
            default_bootscript: None,
            extra_volumes: scaleway_rs::ScalewayImageExtraVolumes {
                volumes: HashMap::new(),
            },
        }
    }

    fn control_plane() -> ScalewayControlPlane {
        ScalewayControlPlane::new(ScalewayConfig {
            access_key: None,
            secret_key: String::from("dummy"),
            default_organization_id: None,
            default_project_id: String::from("proj"),
            default_zone: String::from("fr-par-1"),
            default_instance_type: String::from("DEV1-S"),
            default_architecture: String::from("x86_64"),
        })
        .unwrap_or_else(|err| panic!("config fixture should be valid: {err}"))
    }

    #[test]
    fn select_image_id_returns_newest_creation_date() {
        let images = vec![
            image(ImageSpec {
                id: "older",
                arch: "x86_64",
                state: "available",
                creation_date: "2025-01-01T00:00:00Z",
            }),
            image(ImageSpec {
                id: "newest",
                arch: "x86_64",
                state: "available",
                creation_date: "2025-02-01T00:00:00Z",
            }),
        ];

        let id = control_plane()
            .select_image_id(images, "ubuntu-noble")
            .unwrap_or_else(|err| panic!("image should be selected: {err}"));
        assert_eq!(id, "newest");
    }

    #[test]
    fn select_image_id_errors_on_empty() {
        let err = control_plane()
            .select_image_id(Vec::new(), "ubuntu-noble")
            .expect_err("empty candidates should fail");
        assert!(matches!(err, ScalewayClientError::ImageNotFound { .. }));
    }

    #[test]
    fn filter_images_drops_wrong_arch_and_unavailable() {
        let images = vec![
            image(ImageSpec {
                id: "arm",
                arch: "arm64",
                state: "available",
                creation_date: "2025-01-01T00:00:00Z",
            }),
            image(ImageSpec {
                id: "creating",
                arch: "x86_64",
                state: "creating",
                creation_date: "2025-01-01T00:00:00Z",
            }),
            image(ImageSpec {
                id: "good",
                arch: "x86_64",
                state: "available",
                creation_date: "2025-01-01T00:00:00Z",
            }),
        ];

        let kept = control_plane().filter_images(images);
        assert_eq!(kept.len(), 1);
        assert_eq!(
            kept.first().map(|img| img.id.as_str()),
            Some("good")
        );
    }
}
