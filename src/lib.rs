//! Open Grid Operator
//!
//! Partitions a power network into spatial regions, answers operator queries
//! through per-region analysts with a final synthesis step, and mutates the
//! network through a parse-apply-validate-retry scenario engine. All external
//! collaborators (language model, feasibility validator, clusterer) sit behind
//! traits so the control logic stays testable.

pub mod agents;
pub mod api;
pub mod auth;
pub mod config;
pub mod llm;
pub mod network;
pub mod session;
pub mod telemetry;
pub mod validate;
