use thiserror::Error;
use tracing::{info, warn};

use super::cluster::SpatialClusterer;
use super::model::NetworkModel;

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("region count must be at least 1, got {0}")]
    InvalidRegionCount(usize),
}

/// Assign every node a region label in `[0, k)` from its coordinates.
///
/// Nodes without coordinates are excluded from the clustering input and fall
/// back to region 0. If no node carries a coordinate at all, everything is
/// labeled 0 and the clusterer is never invoked.
pub fn partition(
    model: &mut NetworkModel,
    k: usize,
    clusterer: &dyn SpatialClusterer,
) -> Result<(), PartitionError> {
    if k == 0 {
        return Err(PartitionError::InvalidRegionCount(k));
    }

    let coord_nodes: Vec<(i64, (f64, f64))> = model.coord_nodes().collect();
    let node_ids: Vec<i64> = model.table(super::ComponentKind::Node).ids().collect();

    // Degenerate fallback first, so everything ends up labeled either way.
    for id in &node_ids {
        model.set_node_region(*id, 0);
    }

    if coord_nodes.is_empty() {
        warn!(network = %model.name, "no node coordinates; assigning every node to region 0");
        return Ok(());
    }

    let points: Vec<(f64, f64)> = coord_nodes.iter().map(|(_, c)| *c).collect();
    let labels = clusterer.cluster(&points, k);

    for (i, (id, _)) in coord_nodes.iter().enumerate() {
        match labels.get(i) {
            Some(label) if *label < k => model.set_node_region(*id, *label as i64),
            _ => model.set_node_region(*id, 0),
        }
    }

    info!(
        network = %model.name,
        regions = k,
        clustered_nodes = coord_nodes.len(),
        total_nodes = node_ids.len(),
        "spatial partitioning complete"
    );
    Ok(())
}
