use crate::error::GridCliError;
use crate::grid::{CapacityNode, Grid, NodeFilter, NodeStatus};
use crate::progress::Progress;

use super::disconnect_quietly;

pub async fn list<G: Grid>(
    grid: &mut G,
    status: Option<NodeStatus>,
    progress: &Progress,
) -> Result<Vec<CapacityNode>, GridCliError> {
    tracing::info!("connecting your wallet");
    grid.connect().await?;
    tracing::info!("grid client connected successfully");

    tracing::info!("listing the available grid nodes");
    let filter = NodeFilter {
        status,
        ..NodeFilter::default()
    };
    let session = &*grid;
    let result = progress
        .run("Fetching nodes", session.nodes(&filter))
        .await;

    disconnect_quietly(grid).await;
    let nodes = result?;
    tracing::debug!("{} nodes returned", nodes.len());
    Ok(nodes)
}
