use rand::Rng;
use rand::seq::IndexedRandom;
use vpn_api::LogicalServer;

use crate::{Error, Result};

/// Pool size above which the draw widens to the best four servers.
const WIDE_POOL_THRESHOLD: usize = 50;

/// Pick a near-fastest server from the pool.
///
/// Servers are ranked by score (lower is better) and one is drawn uniformly
/// from the top of the ranking. Pools smaller than `WIDE_POOL_THRESHOLD`
/// always yield the single best server; larger pools spread load across the
/// best four.
pub fn pick<'a, R: Rng + ?Sized>(
    pool: &'a [LogicalServer],
    rng: &mut R,
) -> Result<&'a LogicalServer> {
    if pool.is_empty() {
        return Err(Error::EmptyPool(
            "no servers to pick the fastest from".into(),
        ));
    }

    let mut ranked: Vec<&LogicalServer> = pool.iter().collect();
    ranked.sort_by(|a, b| a.score.total_cmp(&b.score));

    let top_n = if ranked.len() >= WIDE_POOL_THRESHOLD { 4 } else { 1 };

    Ok(ranked[..top_n].choose(rng).copied().unwrap_or(ranked[0]))
}
