use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

/// Attribute column holding the region label after partitioning.
pub const REGION: &str = "region";
/// Edge endpoint columns.
pub const FROM_NODE: &str = "from_node";
pub const TO_NODE: &str = "to_node";
/// Node reference column on loads, generators and static generators.
pub const NODE: &str = "node";
pub const IN_SERVICE: &str = "in_service";
pub const P_MW: &str = "p_mw";

/// The closed set of component tables a network carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ComponentKind {
    Node,
    Edge,
    Load,
    Generator,
    StaticGenerator,
}

/// A scalar attribute value.
///
/// Untagged so interpreter output like `{"p_mw": 50.0, "in_service": false}`
/// deserializes directly. Variant order matters: booleans and integers must
/// be tried before floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
}

impl AttrValue {
    /// Numeric view of this value; `Int` widens to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            AttrValue::Number(n) => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::Number(n) => write!(f, "{n}"),
            AttrValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One row of a component table.
pub type Record = BTreeMap<String, AttrValue>;

/// A component table: integer id (unique within the table) to record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentTable {
    rows: BTreeMap<i64, Record>,
}

impl ComponentTable {
    pub fn insert(&mut self, id: i64, record: Record) {
        self.rows.insert(id, record);
    }

    pub fn get(&self, id: i64) -> Option<&Record> {
        self.rows.get(&id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut Record> {
        self.rows.get_mut(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.rows.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &Record)> {
        self.rows.iter().map(|(id, r)| (*id, r))
    }

    /// Union of attribute names across all rows; the table's column set.
    pub fn columns(&self) -> BTreeSet<String> {
        self.rows
            .values()
            .flat_map(|r| r.keys().cloned())
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown network case '{0}'")]
    UnknownCase(String),

    #[error("edge {edge} references missing node {node}")]
    DanglingEdge { edge: i64, node: i64 },

    #[error("{kind} {id} references missing node {node}")]
    DanglingAttachment {
        kind: ComponentKind,
        id: i64,
        node: i64,
    },
}

/// High-level counts exposed to front ends.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkStats {
    pub nodes: usize,
    pub edges: usize,
    pub loads: usize,
    pub generators: usize,
    pub static_generators: usize,
    pub total_load_mw: f64,
    pub total_generation_mw: f64,
}

/// In-memory tabular representation of a grid: one table per component kind,
/// plus optional node coordinates. Cloning yields a fully isolated copy, which
/// is exactly what the scenario engine relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkModel {
    pub name: String,
    tables: BTreeMap<ComponentKind, ComponentTable>,
    coords: BTreeMap<i64, (f64, f64)>,
}

impl NetworkModel {
    pub fn new(name: impl Into<String>) -> Self {
        let tables = ComponentKind::iter()
            .map(|k| (k, ComponentTable::default()))
            .collect();
        Self {
            name: name.into(),
            tables,
            coords: BTreeMap::new(),
        }
    }

    pub fn table(&self, kind: ComponentKind) -> &ComponentTable {
        // Every kind is seeded in `new`, so the lookup cannot miss.
        &self.tables[&kind]
    }

    pub fn table_mut(&mut self, kind: ComponentKind) -> &mut ComponentTable {
        self.tables.get_mut(&kind).unwrap_or_else(|| unreachable!())
    }

    pub fn add_node(&mut self, id: i64, record: Record, coord: Option<(f64, f64)>) {
        self.table_mut(ComponentKind::Node).insert(id, record);
        if let Some(c) = coord {
            self.coords.insert(id, c);
        }
    }

    pub fn add_edge(&mut self, id: i64, from: i64, to: i64, mut record: Record) {
        record.insert(FROM_NODE.to_string(), AttrValue::Int(from));
        record.insert(TO_NODE.to_string(), AttrValue::Int(to));
        self.table_mut(ComponentKind::Edge).insert(id, record);
    }

    pub fn add_attachment(&mut self, kind: ComponentKind, id: i64, node: i64, mut record: Record) {
        record.insert(NODE.to_string(), AttrValue::Int(node));
        self.table_mut(kind).insert(id, record);
    }

    pub fn node_coord(&self, id: i64) -> Option<(f64, f64)> {
        self.coords.get(&id).copied()
    }

    /// Coordinate-bearing node ids in stable (ascending) order.
    pub fn coord_nodes(&self) -> impl Iterator<Item = (i64, (f64, f64))> + '_ {
        self.coords.iter().map(|(id, c)| (*id, *c))
    }

    pub fn node_region(&self, id: i64) -> Option<i64> {
        self.table(ComponentKind::Node)
            .get(id)
            .and_then(|r| r.get(REGION))
            .and_then(AttrValue::as_i64)
    }

    pub fn set_node_region(&mut self, id: i64, region: i64) {
        if let Some(record) = self.table_mut(ComponentKind::Node).get_mut(id) {
            record.insert(REGION.to_string(), AttrValue::Int(region));
        }
    }

    /// Number of distinct region labels currently assigned.
    pub fn region_count(&self) -> usize {
        self.table(ComponentKind::Node)
            .iter()
            .filter_map(|(_, r)| r.get(REGION).and_then(AttrValue::as_i64))
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Verify referential integrity: edge endpoints and attachment node
    /// references must all resolve to existing nodes.
    pub fn check_references(&self) -> Result<(), ModelError> {
        let nodes = self.table(ComponentKind::Node);
        for (id, record) in self.table(ComponentKind::Edge).iter() {
            for col in [FROM_NODE, TO_NODE] {
                let node = record.get(col).and_then(AttrValue::as_i64).unwrap_or(-1);
                if !nodes.contains(node) {
                    return Err(ModelError::DanglingEdge { edge: id, node });
                }
            }
        }
        for kind in [
            ComponentKind::Load,
            ComponentKind::Generator,
            ComponentKind::StaticGenerator,
        ] {
            for (id, record) in self.table(kind).iter() {
                let node = record.get(NODE).and_then(AttrValue::as_i64).unwrap_or(-1);
                if !nodes.contains(node) {
                    return Err(ModelError::DanglingAttachment { kind, id, node });
                }
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            nodes: self.table(ComponentKind::Node).len(),
            edges: self.table(ComponentKind::Edge).len(),
            loads: self.table(ComponentKind::Load).len(),
            generators: self.table(ComponentKind::Generator).len(),
            static_generators: self.table(ComponentKind::StaticGenerator).len(),
            total_load_mw: self.sum_p_mw(ComponentKind::Load),
            total_generation_mw: self.sum_p_mw(ComponentKind::Generator)
                + self.sum_p_mw(ComponentKind::StaticGenerator),
        }
    }

    fn sum_p_mw(&self, kind: ComponentKind) -> f64 {
        self.table(kind)
            .iter()
            .filter_map(|(_, r)| r.get(P_MW).and_then(AttrValue::as_f64))
            .sum()
    }
}
