//! Regional analysts, map-reduce dispatch, and the scenario mutation engine.

pub mod analyst;
pub mod dispatcher;
pub mod scenario;

pub use analyst::RegionAnalyst;
pub use dispatcher::Dispatcher;
pub use scenario::{apply_actions, ApplyError, ScenarioEngine, ScenarioOutcome};
