//! Feasibility validation of a candidate network state.

pub mod balance;

use anyhow::Result;
use async_trait::async_trait;

use crate::network::NetworkModel;

pub use balance::BalanceValidator;

/// What the validator concluded about a candidate state.
///
/// Structured kind plus message, so callers can branch without string
/// matching; the retry loop still forwards the message text as diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// The state is feasible.
    Converged,
    /// The solver ran but found no feasible operating point.
    NotConverged,
    /// The solver could not evaluate the state at all.
    Failed(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeasibilityValidator: Send + Sync {
    async fn validate(&self, model: &NetworkModel) -> Result<ValidationOutcome>;
}
