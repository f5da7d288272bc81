//! First-fit node selection.

use crate::error::GridCliError;
use crate::grid::{CapacityNode, NodeFilter};
use crate::resolve::ResourceSpec;
use crate::units;

/// Server-side narrowing for the capacity query; [`satisfies`] does the rest.
pub fn candidate_filter() -> NodeFilter {
    NodeFilter {
        status: None,
        healthy: Some(true),
        rentable: Some(true),
    }
}

/// Whether `node` can host `spec`.
///
/// Public IPv4 and IPv6 are gated independently, each on its own requested flag.
pub fn satisfies(node: &CapacityNode, spec: &ResourceSpec) -> bool {
    let free = node.available();

    node.healthy
        && node.rentable
        && free.cpu >= u64::from(spec.cpu_cores)
        && free.memory >= units::gib_to_bytes(spec.memory_gib)
        && free.hdd >= units::gib_to_bytes(spec.disk_gib)
        && (!spec.connectivity.public_ipv4 || node.has_public_ipv4)
        && (!spec.connectivity.public_ipv6 || node.has_public_ipv6)
}

/// Pick the node to deploy `spec` on.
///
/// A pinned `spec.node_id` is returned as-is without looking at the pool; the
/// grid rejects it later if it can't host the machine. Otherwise the first
/// node in pool order that satisfies every requested dimension wins.
pub fn match_node(spec: &ResourceSpec, pool: &[CapacityNode]) -> Result<u32, GridCliError> {
    if let Some(node_id) = spec.node_id {
        return Ok(node_id);
    }

    pool.iter()
        .find(|node| satisfies(node, spec))
        .map(|node| node.node_id)
        .ok_or_else(|| GridCliError::NoMatchingNode {
            request: spec.summary(),
        })
}
