use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tracing::info;

use super::RegionAnalyst;
use crate::llm::QueryService;
use crate::network::{NetworkModel, RegionView};

const SYNTHESIS_SYSTEM_INSTRUCTION: &str = "\
You are the chief system operator. You have received reports from regional analysts.
Synthesize these reports into a final answer for the user.
Highlight key findings from specific regions.";

/// Fans a user query out to every region and synthesizes one final answer.
pub struct Dispatcher {
    query: Arc<dyn QueryService>,
}

impl Dispatcher {
    pub fn new(query: Arc<dyn QueryService>) -> Self {
        Self { query }
    }

    /// Map-reduce flow: identical sub-query per region, analysts run
    /// concurrently, transcript ordered by region id, one synthesis call.
    pub async fn process_query(
        &self,
        model: &NetworkModel,
        regions: usize,
        user_query: &str,
    ) -> Result<String> {
        info!(regions, query = user_query, "dispatching query to regions");
        let sub_query = format!("Regarding your specific region: {user_query}");

        let views: Vec<RegionView> = (0..regions)
            .map(|r| RegionView::extract(model, r as i64))
            .collect();

        let reports = join_all(views.iter().map(|view| {
            let analyst = RegionAnalyst::new(self.query.clone());
            let sub_query = sub_query.clone();
            async move { (view.region_id, analyst.analyze(view, &sub_query).await) }
        }))
        .await;

        // join_all preserves input order, but sort anyway so the transcript
        // stays deterministic by region id no matter how reports arrive.
        let mut reports = reports;
        reports.sort_by_key(|(id, _)| *id);

        let mut transcript = String::from("--- REGIONAL REPORTS ---\n");
        for (region_id, text) in &reports {
            transcript.push_str(&format!("\nREGION {region_id} REPORT:\n{text}\n"));
        }

        let prompt = format!("User Query: {user_query}\n\n{transcript}");
        self.query
            .query(SYNTHESIS_SYSTEM_INSTRUCTION, &prompt)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockQueryService;
    use crate::network::{catalog, partition, KMeans};

    fn partitioned() -> NetworkModel {
        let mut model = catalog::load_case("mini9").unwrap();
        partition(&mut model, 3, &KMeans::new(42)).unwrap();
        model
    }

    #[tokio::test]
    async fn synthesis_sees_reports_ordered_by_region_id() {
        let mut query = MockQueryService::new();
        // Three analyst calls, one per region.
        query
            .expect_query()
            .withf(|system, _| system.contains("region analyst"))
            .times(3)
            .returning(|_, prompt| {
                let region = prompt
                    .split("--- REGION ")
                    .nth(1)
                    .and_then(|s| s.split(' ').next())
                    .unwrap()
                    .to_string();
                Ok(format!("report from region {region}"))
            });
        // One synthesis call receiving the ordered transcript.
        query
            .expect_query()
            .withf(|system, prompt| {
                let r0 = prompt.find("REGION 0 REPORT").unwrap_or(usize::MAX);
                let r1 = prompt.find("REGION 1 REPORT").unwrap_or(usize::MAX);
                let r2 = prompt.find("REGION 2 REPORT").unwrap_or(usize::MAX);
                system.contains("chief system operator")
                    && prompt.contains("User Query: how loaded is the grid?")
                    && r0 < r1
                    && r1 < r2
            })
            .times(1)
            .returning(|_, _| Ok("final answer".to_string()));

        let answer = Dispatcher::new(Arc::new(query))
            .process_query(&partitioned(), 3, "how loaded is the grid?")
            .await
            .unwrap();
        assert_eq!(answer, "final answer");
    }

    #[tokio::test]
    async fn regional_failure_stays_in_the_transcript() {
        let mut query = MockQueryService::new();
        query
            .expect_query()
            .withf(|system, _| system.contains("region analyst"))
            .times(3)
            .returning(|_, prompt| {
                if prompt.contains("--- REGION 1 DATA ---") {
                    Err(anyhow::anyhow!("upstream timeout"))
                } else {
                    Ok("fine".to_string())
                }
            });
        query
            .expect_query()
            .withf(|system, prompt| {
                system.contains("chief system operator")
                    && prompt.contains("Region 1 analyst unavailable")
            })
            .times(1)
            .returning(|_, _| Ok("partial synthesis".to_string()));

        let answer = Dispatcher::new(Arc::new(query))
            .process_query(&partitioned(), 3, "status")
            .await
            .unwrap();
        assert_eq!(answer, "partial synthesis");
    }
}
