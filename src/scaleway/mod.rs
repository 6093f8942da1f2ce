//! Scaleway implementation of the control-plane client.

mod create;
mod error;
mod image;

use std::sync::LazyLock;
use std::time::Duration;

use scaleway_rs::ScalewayApi;

use crate::config::ScalewayConfig;
use crate::control_plane::{
    ClientFuture, ControlPlaneClient, ServerHandle, ServerSnapshot, ServerState,
};
use crate::request::ProvisionRequest;

pub use error::ScalewayClientError;

const SCALEWAY_INSTANCE_API_BASE: &str = "https://api.scaleway.com/instance/v1";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Control plane backed by the Scaleway Instances API.
#[derive(Clone)]
pub struct ScalewayControlPlane {
    api: ScalewayApi,
    config: ScalewayConfig,
}

impl ScalewayControlPlane {
    /// Constructs a new control plane from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScalewayClientError::Config`] when the provided
    /// configuration fails validation.
    pub fn new(config: ScalewayConfig) -> Result<Self, ScalewayClientError> {
        config.validate()?;
        Ok(Self {
            api: ScalewayApi::new(&config.secret_key),
            config,
        })
    }

    fn snapshot_from(server: scaleway_rs::ScalewayInstance) -> ServerSnapshot {
        ServerSnapshot {
            id: server.id,
            state: ServerState::from_provider(&server.state),
            public_address: server.public_ip.map(|ip| ip.address),
        }
    }

    async fn fetch_server(
        &self,
        handle: &ServerHandle,
    ) -> Result<Option<ServerSnapshot>, ScalewayClientError> {
        let mut servers = self
            .api
            .list_instances(&handle.zone)
            .servers(&handle.id)
            .per_page(1)
            .run_async()
            .await?;

        Ok(servers.pop().map(Self::snapshot_from))
    }
}

impl ControlPlaneClient for ScalewayControlPlane {
    type Error = ScalewayClientError;

    fn create<'a>(
        &'a self,
        request: &'a ProvisionRequest,
    ) -> ClientFuture<'a, ServerHandle, Self::Error> {
        Box::pin(async move {
            request.validate().map_err(ScalewayClientError::from)?;
            let image_id = self.resolve_image_id(&request.image).await?;
            let server = self.create_server(request, &image_id).await?;

            Ok(ServerHandle {
                id: server.id,
                zone: self.config.default_zone.clone(),
            })
        })
    }

    fn start<'a>(&'a self, handle: &'a ServerHandle) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.api
                .perform_instance_action_async(&handle.zone, &handle.id, "poweron")
                .await?;
            Ok(())
        })
    }

    fn describe<'a>(
        &'a self,
        handle: &'a ServerHandle,
    ) -> ClientFuture<'a, ServerSnapshot, Self::Error> {
        Box::pin(async move {
            self.fetch_server(handle)
                .await?
                .ok_or_else(|| ScalewayClientError::ServerNotFound {
                    server_id: handle.id.clone(),
                    zone: handle.zone.clone(),
                })
        })
    }
}
