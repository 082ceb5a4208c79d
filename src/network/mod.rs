//! Network model and spatial partitioning.
//!
//! The in-memory tabular grid model is the foundation everything else builds
//! on: the partitioner labels its nodes, region views project slices of it,
//! and the scenario engine mutates isolated copies of it.

pub mod action;
pub mod catalog;
pub mod cluster;
pub mod model;
pub mod partition;
pub mod region;
pub mod render;

pub use action::{Action, ActionList, ActionOp};
pub use cluster::{KMeans, SpatialClusterer};
pub use model::{
    AttrValue, ComponentKind, ComponentTable, ModelError, NetworkModel, NetworkStats, Record,
};
pub use partition::{partition, PartitionError};
pub use region::{RegionCounts, RegionView};
pub use render::render;
