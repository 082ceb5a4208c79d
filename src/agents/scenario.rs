use std::sync::Arc;

use itertools::Itertools;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::{ActionInterpreter, AttemptFeedback};
use crate::network::model::AttrValue;
use crate::network::{action, Action, ActionOp, ComponentKind, NetworkModel};
use crate::validate::{FeasibilityValidator, ValidationOutcome};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

const NOT_UNDERSTOOD: &str = "could not understand the request to modify the network";

/// Why an apply step failed. The whole step aborts on the first error; the
/// mutated copy is discarded, so no rollback is needed.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("{kind} {id} does not exist")]
    UnknownId { kind: ComponentKind, id: i64 },

    #[error("parameter '{param}' is not valid for {kind}; valid parameters: {valid}")]
    UnknownParameter {
        kind: ComponentKind,
        param: String,
        valid: String,
    },

    #[error("invalid percentage format '{value}' for parameter '{param}' of {kind} {id}")]
    BadPercentage {
        kind: ComponentKind,
        id: i64,
        param: String,
        value: String,
    },

    #[error("parameter '{param}' of {kind} {id} is not numeric; cannot apply relative value '{value}'")]
    NotNumeric {
        kind: ComponentKind,
        id: i64,
        param: String,
        value: String,
    },
}

/// Apply every action in order against `model` (the caller's isolated copy).
/// Returns one human-readable report line per applied change.
pub fn apply_actions(model: &mut NetworkModel, actions: &[Action]) -> Result<Vec<String>, ApplyError> {
    let mut report = Vec::new();
    for action in actions {
        match action.op {
            ActionOp::Modify => apply_modify(model, action, &mut report)?,
            ActionOp::Create => {
                // Intentionally minimal: insert the row as given, without
                // per-component-type construction rules.
                model
                    .table_mut(action.component)
                    .insert(action.id, action.parameters.clone());
                report.push(format!(
                    "created {} {} with parameters {{{}}}",
                    action.component,
                    action.id,
                    action
                        .parameters
                        .iter()
                        .map(|(k, v)| format!("{k}: {v}"))
                        .join(", ")
                ));
            }
        }
    }
    Ok(report)
}

fn apply_modify(
    model: &mut NetworkModel,
    action: &Action,
    report: &mut Vec<String>,
) -> Result<(), ApplyError> {
    let kind = action.component;
    let columns = model.table(kind).columns();
    let Some(record) = model.table_mut(kind).get_mut(action.id) else {
        return Err(ApplyError::UnknownId { kind, id: action.id });
    };

    for (param, value) in &action.parameters {
        if !columns.contains(param) {
            return Err(ApplyError::UnknownParameter {
                kind,
                param: param.clone(),
                valid: columns.iter().join(", "),
            });
        }

        let current = record.get(param).cloned();
        let new_value = match action::percent_of(value) {
            Some(Ok(percent)) => {
                let current_num = current.as_ref().and_then(AttrValue::as_f64).ok_or_else(|| {
                    ApplyError::NotNumeric {
                        kind,
                        id: action.id,
                        param: param.clone(),
                        value: value.to_string(),
                    }
                })?;
                AttrValue::Number(current_num * (1.0 + percent / 100.0))
            }
            Some(Err(())) => {
                return Err(ApplyError::BadPercentage {
                    kind,
                    id: action.id,
                    param: param.clone(),
                    value: value.to_string(),
                })
            }
            None => value.clone(),
        };

        record.insert(param.clone(), new_value.clone());
        report.push(format!(
            "modified {} {}: set {} to {} (was {})",
            kind,
            action.id,
            param,
            new_value,
            current
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unset".to_string())
        ));
    }
    Ok(())
}

/// Final answer of a scenario run.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub success: bool,
    /// Human-readable lines describing every applied change.
    pub report: String,
    /// Status message on success, last failure diagnostic otherwise.
    pub diagnostic: String,
    /// The validated candidate model; committing it is the caller's policy.
    pub candidate: Option<NetworkModel>,
}

impl ScenarioOutcome {
    fn not_understood() -> Self {
        Self {
            success: false,
            report: String::new(),
            diagnostic: NOT_UNDERSTOOD.to_string(),
            candidate: None,
        }
    }
}

/// Parse-apply-validate-retry state machine.
///
/// Each attempt interprets the instruction (with the previous attempt's
/// diagnostic and actions from the second attempt onward), applies the
/// resulting actions to a fresh copy of the model, and validates the copy.
/// The authoritative model is never touched.
pub struct ScenarioEngine {
    interpreter: Arc<dyn ActionInterpreter>,
    validator: Arc<dyn FeasibilityValidator>,
    max_attempts: u32,
}

impl ScenarioEngine {
    pub fn new(
        interpreter: Arc<dyn ActionInterpreter>,
        validator: Arc<dyn FeasibilityValidator>,
    ) -> Self {
        Self {
            interpreter,
            validator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn modify_scenario(&self, model: &NetworkModel, instruction: &str) -> ScenarioOutcome {
        let mut feedback: Option<AttemptFeedback> = None;

        for attempt in 1..=self.max_attempts {
            info!(attempt, instruction, "interpreting scenario instruction");
            let actions = match self
                .interpreter
                .interpret(instruction, feedback.clone())
                .await
            {
                Ok(actions) if !actions.is_empty() => actions,
                Ok(_) => {
                    warn!(attempt, "interpreter returned no actions");
                    return ScenarioOutcome::not_understood();
                }
                Err(e) => {
                    warn!(attempt, error = %e, "interpreter call failed");
                    return ScenarioOutcome::not_understood();
                }
            };

            // Copy-on-attempt: mutate an isolated copy, never the original.
            let mut candidate = model.clone();
            let report = match apply_actions(&mut candidate, &actions) {
                Ok(lines) => lines,
                Err(e) => {
                    warn!(attempt, error = %e, "apply step failed");
                    feedback = Some(AttemptFeedback {
                        error: e.to_string(),
                        actions,
                    });
                    continue;
                }
            };

            let diagnostic = match self.validator.validate(&candidate).await {
                Ok(ValidationOutcome::Converged) => {
                    info!(attempt, "scenario validated successfully");
                    return ScenarioOutcome {
                        success: true,
                        report: report.join("\n"),
                        diagnostic: "power flow converged successfully".to_string(),
                        candidate: Some(candidate),
                    };
                }
                Ok(ValidationOutcome::NotConverged) => "power flow did not converge".to_string(),
                Ok(ValidationOutcome::Failed(msg)) => format!("simulation error: {msg}"),
                Err(e) => format!("validator error: {e:#}"),
            };
            warn!(attempt, diagnostic, "validation failed");
            feedback = Some(AttemptFeedback {
                error: diagnostic,
                actions,
            });
        }

        let last_error = feedback.map(|f| f.error).unwrap_or_default();
        ScenarioOutcome {
            success: false,
            report: String::new(),
            diagnostic: format!(
                "failed to modify scenario after {} attempts; last error: {last_error}",
                self.max_attempts
            ),
            candidate: None,
        }
    }
}
