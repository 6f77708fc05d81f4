use async_trait::async_trait;
use vpn_api::{LogicalsResponse, VpnClient};

use crate::{Error, Result};

/// Authenticated API collaborator injected into the selection engine.
///
/// The production implementation wraps `vpn_api::VpnClient`; tests
/// substitute canned directories.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Fetch the full logical-server directory.
    async fn server_directory(&self) -> vpn_api::Result<LogicalsResponse>;

    /// Fetch the account's maximum usable server tier.
    async fn max_tier(&self) -> vpn_api::Result<u8>;
}

/// `Session` backed by the provider REST API.
pub struct ApiSession {
    client: VpnClient,
}

impl ApiSession {
    pub fn new(client: VpnClient) -> Self {
        Self { client }
    }

    /// Create from env vars: `TUNBOX_API_TOKEN` (required),
    /// `TUNBOX_API_BASE_URL` (optional).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let token = std::env::var("TUNBOX_API_TOKEN")
            .map_err(|_| Error::MissingEnv("TUNBOX_API_TOKEN".into()))?;

        let client = match std::env::var("TUNBOX_API_BASE_URL") {
            Ok(base) => VpnClient::with_base_url(token, base),
            Err(_) => VpnClient::new(token),
        };

        Ok(Self { client })
    }
}

#[async_trait]
impl Session for ApiSession {
    async fn server_directory(&self) -> vpn_api::Result<LogicalsResponse> {
        self.client.logicals().await
    }

    async fn max_tier(&self) -> vpn_api::Result<u8> {
        Ok(self.client.vpn_info().await?.vpn.max_tier)
    }
}
