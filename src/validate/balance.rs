use anyhow::Result;
use async_trait::async_trait;

use super::{FeasibilityValidator, ValidationOutcome};
use crate::network::model::{AttrValue, IN_SERVICE, NODE, P_MW};
use crate::network::{ComponentKind, NetworkModel, Record};

/// Simulated stand-in for an AC power-flow solver.
///
/// Checks referential integrity, requires at least one in-service generator,
/// and reports non-convergence when in-service generation cannot cover the
/// in-service load within the configured margin. A real deployment would put
/// a numerical solver behind the same trait.
#[derive(Debug, Clone)]
pub struct BalanceValidator {
    pub margin_mw: f64,
}

impl BalanceValidator {
    pub fn new(margin_mw: f64) -> Self {
        Self { margin_mw }
    }

    fn effective_p_mw(&self, model: &NetworkModel, kind: ComponentKind) -> f64 {
        model
            .table(kind)
            .iter()
            .filter(|(_, r)| in_service(r) && node_in_service(model, r))
            .filter_map(|(_, r)| {
                let p = r.get(P_MW).and_then(AttrValue::as_f64)?;
                let scaling = r
                    .get("scaling")
                    .and_then(AttrValue::as_f64)
                    .unwrap_or(1.0);
                Some(p * scaling)
            })
            .sum()
    }

    fn in_service_generators(&self, model: &NetworkModel) -> usize {
        [ComponentKind::Generator, ComponentKind::StaticGenerator]
            .into_iter()
            .map(|kind| {
                model
                    .table(kind)
                    .iter()
                    .filter(|(_, r)| in_service(r) && node_in_service(model, r))
                    .count()
            })
            .sum()
    }
}

/// Missing `in_service` counts as in service, matching table defaults.
fn in_service(record: &Record) -> bool {
    record
        .get(IN_SERVICE)
        .and_then(AttrValue::as_bool)
        .unwrap_or(true)
}

fn node_in_service(model: &NetworkModel, record: &Record) -> bool {
    let Some(node) = record.get(NODE).and_then(AttrValue::as_i64) else {
        return true;
    };
    model
        .table(ComponentKind::Node)
        .get(node)
        .map(in_service)
        .unwrap_or(false)
}

#[async_trait]
impl FeasibilityValidator for BalanceValidator {
    async fn validate(&self, model: &NetworkModel) -> Result<ValidationOutcome> {
        if let Err(e) = model.check_references() {
            return Ok(ValidationOutcome::Failed(e.to_string()));
        }
        if self.in_service_generators(model) == 0 {
            return Ok(ValidationOutcome::Failed(
                "no in-service generation available".to_string(),
            ));
        }

        let load = self.effective_p_mw(model, ComponentKind::Load);
        let generation = self.effective_p_mw(model, ComponentKind::Generator)
            + self.effective_p_mw(model, ComponentKind::StaticGenerator);
        if load > generation + self.margin_mw {
            return Ok(ValidationOutcome::NotConverged);
        }
        Ok(ValidationOutcome::Converged)
    }
}
