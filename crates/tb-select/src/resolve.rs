use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;
use vpn_api::{LogicalServer, PhysicalServer};

use crate::filter;
use crate::{Error, Result};

/// Concrete connection endpoint for a chosen logical server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub entry_ip: String,
    pub exit_ip: String,
    pub domain: String,
}

/// Resolve a logical server to one of its active physical nodes.
///
/// The advertised domain is only trusted when the chosen node's entry and
/// exit IPs agree. When they differ (secure-core routing), the certificate
/// the client will see belongs to the exit side, so the display domain is
/// recovered by finding the physical node, anywhere in the directory, whose
/// entry IP is the chosen exit IP. No match keeps the advertised domain as
/// a best-effort fallback.
pub fn resolve<R: Rng + ?Sized>(
    name: &str,
    servers: &[LogicalServer],
    rng: &mut R,
) -> Result<Endpoint> {
    let server = filter::by_name(servers, name)?;

    let active: Vec<&PhysicalServer> = server.servers.iter().filter(|p| p.status == 1).collect();
    let node = active
        .choose(rng)
        .ok_or_else(|| Error::NotFound(format!("\"{name}\" has no active physical server")))?;

    let domain = if node.entry_ip == node.exit_ip {
        server.domain.clone()
    } else {
        matching_domain(servers, &node.exit_ip).unwrap_or_else(|| {
            debug!(
                server = name,
                exit_ip = %node.exit_ip,
                "no node matches the exit IP, keeping advertised domain"
            );
            server.domain.clone()
        })
    };

    Ok(Endpoint {
        entry_ip: node.entry_ip.clone(),
        exit_ip: node.exit_ip.clone(),
        domain,
    })
}

/// The domain of the physical node reachable at `exit_ip`, searched across
/// every server in the directory.
fn matching_domain(servers: &[LogicalServer], exit_ip: &str) -> Option<String> {
    servers
        .iter()
        .flat_map(|s| s.servers.iter())
        .find(|p| p.entry_ip == exit_ip)
        .map(|p| p.domain.clone())
}
