use vpn_api::{Feature, LogicalServer};

use crate::{Error, Result, ServerDirectory};

/// Features excluded from the plain selection strategies (fastest, country,
/// random): these route differently and are only picked when asked for.
pub const DEFAULT_EXCLUDED: [Feature; 3] = [Feature::SecureCore, Feature::Tor, Feature::P2P];

/// All servers the user may connect to: active and within the entitlement
/// tier. Directory order is preserved.
pub fn usable_servers(directory: &ServerDirectory, user_tier: u8) -> Vec<LogicalServer> {
    directory
        .servers
        .iter()
        .filter(|s| s.status == 1 && s.tier <= user_tier)
        .cloned()
        .collect()
}

/// Drop servers whose feature is in the exclusion set.
pub fn exclude_features(
    mut servers: Vec<LogicalServer>,
    excluded: &[Feature],
) -> Vec<LogicalServer> {
    servers.retain(|s| !excluded.contains(&s.features));
    servers
}

/// Keep only servers exiting in the given country (trimmed,
/// case-insensitive).
pub fn by_country(mut servers: Vec<LogicalServer>, code: &str) -> Result<Vec<LogicalServer>> {
    let code = code.trim().to_ascii_uppercase();
    servers.retain(|s| s.exit_country.eq_ignore_ascii_case(&code));
    if servers.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "invalid country code \"{code}\""
        )));
    }
    Ok(servers)
}

/// Keep only servers carrying exactly the given feature.
pub fn by_feature(mut servers: Vec<LogicalServer>, feature: Feature) -> Result<Vec<LogicalServer>> {
    servers.retain(|s| s.features == feature);
    if servers.is_empty() {
        return Err(Error::EmptyPool(format!(
            "no servers found with the {feature:?} feature"
        )));
    }
    Ok(servers)
}

/// Exact lookup by canonical servername.
pub fn by_name<'a>(servers: &'a [LogicalServer], name: &str) -> Result<&'a LogicalServer> {
    servers
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| Error::NotFound(format!("\"{name}\" is not an existing server")))
}

/// Map a user-facing feature literal (`sc`, `tor`, `p2p`, `stream`, `ipv6`)
/// to its `Feature` variant.
pub fn feature_from_literal(literal: &str) -> Result<Feature> {
    match literal.trim().to_ascii_lowercase().as_str() {
        "sc" => Ok(Feature::SecureCore),
        "tor" => Ok(Feature::Tor),
        "p2p" => Ok(Feature::P2P),
        "stream" => Ok(Feature::Streaming),
        "ipv6" => Ok(Feature::Ipv6),
        _ => Err(Error::InvalidArgument("Feature is non-existent".into())),
    }
}
