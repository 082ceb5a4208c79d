use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::QueryService;
use crate::network::{render, RegionView};

/// Answers a sub-query against one region's data with a single query-service
/// call. Collaborator failures are folded into the returned text instead of
/// propagated, so one region cannot abort the whole map-reduce.
pub struct RegionAnalyst {
    query: Arc<dyn QueryService>,
}

impl RegionAnalyst {
    pub fn new(query: Arc<dyn QueryService>) -> Self {
        Self { query }
    }

    pub async fn analyze(&self, view: &RegionView, sub_query: &str) -> String {
        let system_instruction = format!(
            "You are the region analyst responsible for region {} of a power network.\n\
             You have access to the node, edge, load, and generation data for your region only.\n\
             Answer the query accurately based on that data. Be concise and point out any \
             violations if asked.",
            view.region_id
        );
        let context = render(view);
        let prompt = format!(
            "--- REGION {} DATA ---\n{}\n\n--- QUERY ---\n{}",
            view.region_id, context, sub_query
        );

        debug!(region = view.region_id, "analyst issuing query");
        match self.query.query(&system_instruction, &prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(region = view.region_id, error = %e, "region analyst query failed");
                format!("Region {} analyst unavailable: {e:#}", view.region_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockQueryService;
    use crate::network::{catalog, partition, KMeans, RegionView};

    fn view() -> RegionView {
        let mut model = catalog::load_case("mini9").unwrap();
        partition(&mut model, 3, &KMeans::new(42)).unwrap();
        RegionView::extract(&model, 1)
    }

    #[tokio::test]
    async fn passes_region_framing_and_rendered_context() {
        let mut query = MockQueryService::new();
        query
            .expect_query()
            .withf(|system, prompt| {
                system.contains("region 1")
                    && prompt.contains("--- REGION 1 DATA ---")
                    && prompt.contains("## Power Balance")
                    && prompt.contains("any overloads?")
            })
            .times(1)
            .returning(|_, _| Ok("no overloads".to_string()));

        let answer = RegionAnalyst::new(Arc::new(query))
            .analyze(&view(), "any overloads?")
            .await;
        assert_eq!(answer, "no overloads");
    }

    #[tokio::test]
    async fn collaborator_failure_is_embedded_not_raised() {
        let mut query = MockQueryService::new();
        query
            .expect_query()
            .returning(|_, _| Err(anyhow::anyhow!("service timeout")));

        let answer = RegionAnalyst::new(Arc::new(query))
            .analyze(&view(), "status?")
            .await;
        assert!(answer.contains("Region 1 analyst unavailable"));
        assert!(answer.contains("service timeout"));
    }
}
