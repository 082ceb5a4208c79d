use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::model::{
    AttrValue, ComponentKind, NetworkModel, Record, FROM_NODE, NODE, P_MW, TO_NODE,
};

/// An edge included in a region view, flagged when it crosses the boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionEdge {
    pub record: Record,
    pub is_boundary: bool,
}

/// Per-region counts for status display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCounts {
    pub region_id: i64,
    pub nodes: usize,
    pub edges: usize,
    pub boundary_edges: usize,
    pub loads: usize,
    pub generators: usize,
    pub static_generators: usize,
}

/// Read-only projection of one region: copied out of the model, never
/// aliased, so consumers cannot corrupt the source.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionView {
    pub region_id: i64,
    pub nodes: BTreeMap<i64, Record>,
    pub edges: BTreeMap<i64, RegionEdge>,
    pub loads: BTreeMap<i64, Record>,
    pub generators: BTreeMap<i64, Record>,
    pub static_generators: BTreeMap<i64, Record>,
}

impl RegionView {
    /// Derive the subset of the model belonging to `region_id`. An empty
    /// region yields empty subsets, not an error.
    pub fn extract(model: &NetworkModel, region_id: i64) -> Self {
        let nodes: BTreeMap<i64, Record> = model
            .table(ComponentKind::Node)
            .iter()
            .filter(|(id, _)| model.node_region(*id) == Some(region_id))
            .map(|(id, r)| (id, r.clone()))
            .collect();
        let node_ids: BTreeSet<i64> = nodes.keys().copied().collect();

        let edges = model
            .table(ComponentKind::Edge)
            .iter()
            .filter_map(|(id, r)| {
                let from = attr_node(r, FROM_NODE)?;
                let to = attr_node(r, TO_NODE)?;
                let from_in = node_ids.contains(&from);
                let to_in = node_ids.contains(&to);
                if !from_in && !to_in {
                    return None;
                }
                Some((
                    id,
                    RegionEdge {
                        record: r.clone(),
                        is_boundary: from_in != to_in,
                    },
                ))
            })
            .collect();

        let attached = |kind: ComponentKind| -> BTreeMap<i64, Record> {
            model
                .table(kind)
                .iter()
                .filter(|(_, r)| {
                    attr_node(r, NODE).is_some_and(|n| node_ids.contains(&n))
                })
                .map(|(id, r)| (id, r.clone()))
                .collect()
        };

        Self {
            region_id,
            nodes,
            edges,
            loads: attached(ComponentKind::Load),
            generators: attached(ComponentKind::Generator),
            static_generators: attached(ComponentKind::StaticGenerator),
        }
    }

    pub fn boundary_edge_count(&self) -> usize {
        self.edges.values().filter(|e| e.is_boundary).count()
    }

    pub fn total_load_mw(&self) -> f64 {
        sum_p_mw(&self.loads)
    }

    /// Generation is the sum over generators and static generators.
    pub fn total_generation_mw(&self) -> f64 {
        sum_p_mw(&self.generators) + sum_p_mw(&self.static_generators)
    }

    /// Net balance: positive = exporting, negative = importing.
    pub fn net_balance_mw(&self) -> f64 {
        self.total_generation_mw() - self.total_load_mw()
    }

    pub fn counts(&self) -> RegionCounts {
        RegionCounts {
            region_id: self.region_id,
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            boundary_edges: self.boundary_edge_count(),
            loads: self.loads.len(),
            generators: self.generators.len(),
            static_generators: self.static_generators.len(),
        }
    }
}

fn attr_node(record: &Record, col: &str) -> Option<i64> {
    record.get(col).and_then(AttrValue::as_i64)
}

fn sum_p_mw(rows: &BTreeMap<i64, Record>) -> f64 {
    rows.values()
        .filter_map(|r| r.get(P_MW).and_then(AttrValue::as_f64))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{catalog, partition, KMeans};

    fn partitioned() -> NetworkModel {
        let mut model = catalog::load_case("mini9").unwrap();
        partition(&mut model, 3, &KMeans::new(42)).unwrap();
        model
    }

    #[test]
    fn extraction_is_idempotent() {
        let model = partitioned();
        for region in 0..3 {
            let a = RegionView::extract(&model, region);
            let b = RegionView::extract(&model, region);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn internal_xor_boundary_holds_for_every_edge() {
        let model = partitioned();
        for region in 0..3 {
            let view = RegionView::extract(&model, region);
            for edge in view.edges.values() {
                let from = attr_node(&edge.record, FROM_NODE).unwrap();
                let to = attr_node(&edge.record, TO_NODE).unwrap();
                let from_in = view.nodes.contains_key(&from);
                let to_in = view.nodes.contains_key(&to);
                // Exactly one endpoint outside iff flagged as boundary.
                assert_eq!(edge.is_boundary, from_in != to_in);
                assert!(from_in || to_in);
            }
        }
    }

    #[test]
    fn every_node_lands_in_exactly_one_region() {
        let model = partitioned();
        let total: usize = (0..3)
            .map(|r| RegionView::extract(&model, r).nodes.len())
            .sum();
        assert_eq!(total, model.stats().nodes);
    }

    #[test]
    fn attachments_follow_their_node() {
        let model = partitioned();
        for region in 0..3 {
            let view = RegionView::extract(&model, region);
            for load in view.loads.values() {
                let node = attr_node(load, NODE).unwrap();
                assert!(view.nodes.contains_key(&node));
            }
            for generator in view.generators.values() {
                let node = attr_node(generator, NODE).unwrap();
                assert!(view.nodes.contains_key(&node));
            }
        }
    }

    #[test]
    fn empty_region_yields_empty_subsets() {
        let model = partitioned();
        let view = RegionView::extract(&model, 99);
        assert!(view.nodes.is_empty());
        assert!(view.edges.is_empty());
        assert!(view.loads.is_empty());
        assert_eq!(view.counts().boundary_edges, 0);
    }

    #[test]
    fn balance_sign_convention() {
        let model = partitioned();
        let total_balance: f64 = (0..3)
            .map(|r| RegionView::extract(&model, r).net_balance_mw())
            .sum();
        let stats = model.stats();
        let expected = stats.total_generation_mw - stats.total_load_mw;
        assert!((total_balance - expected).abs() < 1e-9);
    }
}
