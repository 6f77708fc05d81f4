//! Typed Rust client for the VPN provider's REST API.
//!
//! Covers the subset needed for server selection:
//! the logical-server directory and the account's VPN entitlement.

mod types;

pub use types::*;

const BASE_URL: &str = "https://api.tunbox.net/v1";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("vpn api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("vpn api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the VPN provider REST API.
#[derive(Clone)]
pub struct VpnClient {
    token: String,
    base_url: String,
    http: reqwest::Client,
}

impl VpnClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, BASE_URL)
    }

    /// Point the client at a non-default API host (staging, tests).
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api { endpoint, status, body });
        }
        Ok(resp)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the full logical-server directory.
    pub async fn logicals(&self) -> Result<LogicalsResponse> {
        let resp = self
            .http
            .get(self.url("/vpn/logicals"))
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check(resp, "logicals")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    /// Fetch the account's VPN entitlement (maximum usable tier).
    pub async fn vpn_info(&self) -> Result<VpnInfoResponse> {
        let resp = self
            .http
            .get(self.url("/vpn"))
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check(resp, "vpn info")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }
}
