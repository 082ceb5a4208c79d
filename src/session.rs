//! Session context: owns the authoritative network model and wires the
//! collaborators together. One session per model instance; creating several
//! sessions (and thus several models) is explicitly supported.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::agents::{Dispatcher, ScenarioEngine};
use crate::config::Config;
use crate::llm::{ActionInterpreter, GeminiClient, QueryService};
use crate::network::model::NetworkStats;
use crate::network::{catalog, partition, KMeans, NetworkModel, RegionCounts, RegionView};
use crate::validate::{BalanceValidator, FeasibilityValidator};

/// Keywords that route a chat message into the scenario engine instead of the
/// analytical map-reduce.
const MODIFICATION_KEYWORDS: &[&str] = &[
    "outage",
    "modify",
    "increase",
    "decrease",
    "set",
    "create",
    "disconnect",
    "change",
    "simulate",
];

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub session: Arc<Session>,
}

impl AppState {
    pub fn new(cfg: Config) -> Result<Self> {
        let llm = Arc::new(GeminiClient::new(&cfg.llm)?);
        let validator = Arc::new(BalanceValidator::new(cfg.scenario.balance_margin_mw));
        let session = Arc::new(Session::new(&cfg, llm.clone(), llm, validator)?);
        Ok(Self { cfg, session })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub case: String,
    pub regions: usize,
    pub network: NetworkStats,
    pub per_region: Vec<RegionCounts>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReply {
    pub success: bool,
    pub report: String,
    pub diagnostic: String,
    /// Whether a successful candidate replaced the session model.
    pub committed: bool,
}

pub struct Session {
    pub id: Uuid,
    regions: usize,
    seed: u64,
    auto_commit: bool,
    model: RwLock<NetworkModel>,
    dispatcher: Dispatcher,
    engine: ScenarioEngine,
}

impl Session {
    pub fn new(
        cfg: &Config,
        query: Arc<dyn QueryService>,
        interpreter: Arc<dyn ActionInterpreter>,
        validator: Arc<dyn FeasibilityValidator>,
    ) -> Result<Self> {
        let id = Uuid::new_v4();
        let regions = cfg.network.regions;
        let model = build_model(&cfg.network.case, regions, cfg.network.seed)?;
        info!(
            session = %id,
            case = cfg.network.case,
            regions,
            "session initialized"
        );
        Ok(Self {
            id,
            regions,
            seed: cfg.network.seed,
            auto_commit: cfg.scenario.auto_commit,
            model: RwLock::new(model),
            dispatcher: Dispatcher::new(query),
            engine: ScenarioEngine::new(interpreter, validator)
                .with_max_attempts(cfg.scenario.max_attempts),
        })
    }

    /// Replace the session model with a freshly loaded, partitioned case.
    pub async fn load_case(&self, name: &str) -> Result<NetworkStats> {
        let model = build_model(name, self.regions, self.seed)?;
        let stats = model.stats();
        *self.model.write().await = model;
        info!(session = %self.id, case = name, "case loaded");
        Ok(stats)
    }

    /// Fan the query out to all region analysts and synthesize one answer.
    pub async fn process_query(&self, user_query: &str) -> Result<String> {
        let snapshot = self.model.read().await.clone();
        self.dispatcher
            .process_query(&snapshot, self.regions, user_query)
            .await
    }

    /// Run the scenario engine against a snapshot of the model. On success,
    /// the candidate replaces the session model only when the commit policy
    /// says so (`commit` overrides the configured default).
    pub async fn modify_scenario(
        &self,
        instruction: &str,
        commit: Option<bool>,
    ) -> ScenarioReply {
        let snapshot = self.model.read().await.clone();
        let outcome = self.engine.modify_scenario(&snapshot, instruction).await;

        let mut committed = false;
        if outcome.success && commit.unwrap_or(self.auto_commit) {
            if let Some(candidate) = outcome.candidate {
                *self.model.write().await = candidate;
                committed = true;
                info!(session = %self.id, "scenario committed to session model");
            }
        }

        let scope = if committed { "" } else { " (dry run, not committed)" };
        let diagnostic = format!("{}{}", outcome.diagnostic, scope);
        ScenarioReply {
            success: outcome.success,
            report: outcome.report,
            diagnostic,
            committed,
        }
    }

    /// Route a chat-style message on a keyword heuristic: mutation verbs go
    /// to the scenario engine, everything else to the analysts.
    pub async fn handle(&self, message: &str) -> Result<String> {
        let lowered = message.to_lowercase();
        if MODIFICATION_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            let reply = self.modify_scenario(message, None).await;
            if reply.success {
                Ok(format!(
                    "Scenario modified successfully.\nActions Taken:\n{}\nSystem Status: {}",
                    reply.report, reply.diagnostic
                ))
            } else {
                Ok(reply.diagnostic)
            }
        } else {
            self.process_query(message).await
        }
    }

    pub async fn status(&self) -> SessionStatus {
        let model = self.model.read().await;
        let per_region = (0..self.regions)
            .map(|r| RegionView::extract(&model, r as i64).counts())
            .collect();
        SessionStatus {
            session_id: self.id,
            case: model.name.clone(),
            regions: self.regions,
            network: model.stats(),
            per_region,
        }
    }

    pub fn regions(&self) -> usize {
        self.regions
    }

    pub async fn region_view(&self, region_id: i64) -> RegionView {
        let model = self.model.read().await;
        RegionView::extract(&model, region_id)
    }
}

fn build_model(case: &str, regions: usize, seed: u64) -> Result<NetworkModel> {
    let mut model = catalog::load_case(case)?;
    model.check_references()?;
    partition(&mut model, regions, &KMeans::new(seed))?;
    Ok(model)
}
