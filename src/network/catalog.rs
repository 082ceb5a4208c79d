//! Built-in synthetic network cases.
//!
//! Small deterministic grids used by default sessions and by tests. `mini9`
//! is three spatial clumps of three nodes joined by tie-edges; `ring13` is a
//! single ring.

use std::f64::consts::TAU;

use super::model::{AttrValue, ComponentKind, ModelError, NetworkModel, Record};

pub const CASES: &[&str] = &["mini9", "ring13"];

pub fn load_case(name: &str) -> Result<NetworkModel, ModelError> {
    match name {
        "mini9" => Ok(mini9()),
        "ring13" => Ok(ring13()),
        other => Err(ModelError::UnknownCase(other.to_string())),
    }
}

fn record(pairs: &[(&str, AttrValue)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn node_record(vn_kv: f64) -> Record {
    record(&[
        ("vn_kv", AttrValue::Number(vn_kv)),
        ("in_service", AttrValue::Bool(true)),
    ])
}

fn edge_record(length_km: f64) -> Record {
    record(&[
        ("length_km", AttrValue::Number(length_km)),
        ("max_i_ka", AttrValue::Number(0.6)),
        ("in_service", AttrValue::Bool(true)),
    ])
}

fn load_record(p_mw: f64, q_mvar: f64) -> Record {
    record(&[
        ("p_mw", AttrValue::Number(p_mw)),
        ("q_mvar", AttrValue::Number(q_mvar)),
        ("scaling", AttrValue::Number(1.0)),
        ("in_service", AttrValue::Bool(true)),
    ])
}

fn generator_record(p_mw: f64, vm_pu: f64) -> Record {
    record(&[
        ("p_mw", AttrValue::Number(p_mw)),
        ("q_mvar", AttrValue::Number(0.0)),
        ("vm_pu", AttrValue::Number(vm_pu)),
        ("scaling", AttrValue::Number(1.0)),
        ("in_service", AttrValue::Bool(true)),
    ])
}

fn mini9() -> NetworkModel {
    let mut model = NetworkModel::new("mini9");

    let clumps = [(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)];
    let offsets = [(0.0, 0.0), (1.0, 0.5), (0.5, 1.0)];
    let mut id = 1;
    for (cx, cy) in clumps {
        for (ox, oy) in offsets {
            model.add_node(id, node_record(110.0), Some((cx + ox, cy + oy)));
            id += 1;
        }
    }

    // Intra-clump edges plus two tie-edges (3-4 and 6-7).
    let edges = [
        (1, 1, 2, 1.2),
        (2, 2, 3, 0.8),
        (3, 3, 4, 9.5),
        (4, 4, 5, 1.1),
        (5, 5, 6, 0.9),
        (6, 6, 7, 9.8),
        (7, 7, 8, 1.3),
        (8, 8, 9, 0.7),
    ];
    for (edge_id, from, to, length) in edges {
        model.add_edge(edge_id, from, to, edge_record(length));
    }

    model.add_attachment(ComponentKind::Load, 1, 2, load_record(40.0, 10.0));
    model.add_attachment(ComponentKind::Load, 2, 5, load_record(55.0, 12.0));
    model.add_attachment(ComponentKind::Load, 3, 8, load_record(10.0, 2.0));

    model.add_attachment(ComponentKind::Generator, 1, 1, generator_record(80.0, 1.02));
    model.add_attachment(ComponentKind::Generator, 2, 4, generator_record(60.0, 1.01));
    model.add_attachment(
        ComponentKind::StaticGenerator,
        1,
        7,
        generator_record(30.0, 1.0),
    );

    model
}

fn ring13() -> NetworkModel {
    let mut model = NetworkModel::new("ring13");
    let n = 13;
    for i in 0..n {
        let angle = i as f64 * TAU / n as f64;
        model.add_node(
            i + 1,
            node_record(20.0),
            Some((5.0 * angle.cos(), 5.0 * angle.sin())),
        );
    }
    for i in 0..n {
        let from = i + 1;
        let to = (i + 1) % n + 1;
        model.add_edge(i + 1, from, to, edge_record(2.0));
    }

    model.add_attachment(ComponentKind::Load, 1, 2, load_record(20.0, 4.0));
    model.add_attachment(ComponentKind::Load, 2, 6, load_record(20.0, 4.0));
    model.add_attachment(ComponentKind::Load, 3, 10, load_record(20.0, 4.0));

    model.add_attachment(ComponentKind::Generator, 1, 1, generator_record(50.0, 1.0));
    model.add_attachment(ComponentKind::Generator, 2, 8, generator_record(40.0, 1.0));

    model
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_cases_load_with_valid_references() {
        for case in CASES {
            let model = load_case(case).unwrap();
            model.check_references().unwrap();
            assert!(model.stats().nodes > 0);
        }
    }

    #[test]
    fn unknown_case_is_an_error() {
        let err = load_case("case9000").unwrap_err();
        assert!(err.to_string().contains("case9000"));
    }

    #[test]
    fn mini9_shape() {
        let stats = load_case("mini9").unwrap().stats();
        assert_eq!(stats.nodes, 9);
        assert_eq!(stats.edges, 8);
        assert_eq!(stats.loads, 3);
        assert_eq!(stats.generators, 2);
        assert_eq!(stats.static_generators, 1);
        assert_eq!(stats.total_load_mw, 105.0);
        assert_eq!(stats.total_generation_mw, 170.0);
    }

    #[test]
    fn mini9_generation_covers_load() {
        let stats = load_case("mini9").unwrap().stats();
        assert!(stats.total_generation_mw >= stats.total_load_mw);
    }
}
