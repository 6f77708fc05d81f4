use serde::{Deserialize, Serialize};

// ── Directory types ──────────────────────────────────────────────────

/// Response body of `/vpn/logicals`. This exact document is what the
/// selection engine persists to its local cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalsResponse {
    #[serde(rename = "LogicalServers")]
    pub logical_servers: Vec<LogicalServer>,
}

/// A named VPN endpoint as advertised by the provider, possibly backed by
/// several physical nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogicalServer {
    /// Unique display identifier, e.g. `"PT#1"`.
    pub name: String,
    /// Advertised hostname. Not always the hostname the client ends up
    /// talking to; see the physical node's own `domain`.
    pub domain: String,
    /// Minimum entitlement tier required to use this server.
    pub tier: u8,
    /// 0 = disabled, 1 = enabled.
    pub status: u8,
    /// Load/latency ranking proxy; lower is better.
    pub score: f64,
    pub features: Feature,
    /// Two-letter exit country code.
    pub exit_country: String,
    pub servers: Vec<PhysicalServer>,
}

/// One physical node backing a logical server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhysicalServer {
    #[serde(rename = "EntryIP")]
    pub entry_ip: String,
    #[serde(rename = "ExitIP")]
    pub exit_ip: String,
    /// 0 = disabled, 1 = enabled.
    pub status: u8,
    /// Hostname actually reachable at this node. Diverges from the logical
    /// server's `domain` in secure-core configurations.
    pub domain: String,
}

/// Feature of a logical server, serialized as the provider's integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Feature {
    None,
    SecureCore,
    Tor,
    P2P,
    Streaming,
    Ipv6,
}

impl TryFrom<u32> for Feature {
    type Error = String;

    fn try_from(code: u32) -> std::result::Result<Self, String> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::SecureCore),
            2 => Ok(Self::Tor),
            4 => Ok(Self::P2P),
            8 => Ok(Self::Streaming),
            16 => Ok(Self::Ipv6),
            other => Err(format!("unknown feature code {other}")),
        }
    }
}

impl From<Feature> for u32 {
    fn from(feature: Feature) -> u32 {
        match feature {
            Feature::None => 0,
            Feature::SecureCore => 1,
            Feature::Tor => 2,
            Feature::P2P => 4,
            Feature::Streaming => 8,
            Feature::Ipv6 => 16,
        }
    }
}

// ── Account types ────────────────────────────────────────────────────

/// Response body of `/vpn`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpnInfoResponse {
    #[serde(rename = "VPN")]
    pub vpn: VpnInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpnInfo {
    pub max_tier: u8,
}
