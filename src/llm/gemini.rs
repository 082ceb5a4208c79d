use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ActionInterpreter, AttemptFeedback, QueryService};
use crate::config::LlmConfig;
use crate::network::{Action, ActionList};

const INTERPRETER_SYSTEM_INSTRUCTION: &str = "\
You are a power system operator assistant. Convert natural language instructions into structured network actions.
VALID PARAMETERS CHEAT SHEET:
- load: p_mw, q_mvar, scaling, in_service
- generator / static-generator: p_mw, q_mvar, vm_pu, scaling, in_service
- edge: length_km, max_i_ka, in_service (CANNOT directly set power)
- node: vn_kv, in_service
If the user asks to modify an edge's power, you cannot do it directly; strictly output valid actions only.
You can use relative values like '+10%' or '-5%' in the parameters for numeric fields.";

/// HTTP client for the Gemini generateContent API.
///
/// Implements both collaborator traits: free-text queries for the analysts
/// and schema-constrained structured output for the scenario interpreter.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_seconds))
            .build()?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            client,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    async fn generate(
        &self,
        system_instruction: &str,
        prompt: &str,
        response_schema: Option<serde_json::Value>,
    ) -> Result<String> {
        let final_prompt =
            format!("System Instruction: {system_instruction}\n\nUser Prompt: {prompt}");

        let mut body = json!({
            "contents": [{ "parts": [{ "text": final_prompt }] }],
        });
        if let Some(schema) = response_schema {
            body["generationConfig"] = json!({
                "response_mime_type": "application/json",
                "response_json_schema": schema,
            });
        }

        let resp = self
            .client
            .post(self.url())
            .json(&body)
            .send()
            .await
            .context("generateContent POST failed")?;
        let status = resp.status();
        let text = resp.text().await.context("generateContent read failed")?;
        if !status.is_success() {
            anyhow::bail!("language model API error: HTTP {status}: {text}");
        }

        let raw: GenerateResponse =
            serde_json::from_str(&text).context("generateContent JSON parse failed")?;
        let answer = raw
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .context("generateContent reply carried no candidate text")?;
        debug!(chars = answer.len(), "language model reply received");
        Ok(answer)
    }
}

#[async_trait]
impl QueryService for GeminiClient {
    async fn query(&self, system_instruction: &str, prompt: &str) -> Result<String> {
        self.generate(system_instruction, prompt, None).await
    }
}

#[async_trait]
impl ActionInterpreter for GeminiClient {
    async fn interpret(
        &self,
        instruction: &str,
        feedback: Option<AttemptFeedback>,
    ) -> Result<Vec<Action>> {
        let mut prompt = format!(
            "Context: you are controlling a power grid simulator. \
             The user wants to modify the grid state.\nInstruction: {instruction}\n"
        );
        if let Some(fb) = feedback {
            let actions_json = serde_json::to_string(&fb.actions)?;
            prompt.push_str(&format!(
                "\nPREVIOUS ATTEMPT FAILED.\nError: {}\nPrevious Actions: {}\nPlease correct the actions.",
                fb.error, actions_json
            ));
        }

        let reply = self
            .generate(
                INTERPRETER_SYSTEM_INSTRUCTION,
                &prompt,
                Some(Action::response_schema()),
            )
            .await?;
        let list: ActionList =
            serde_json::from_str(&reply).context("interpreter reply did not match action schema")?;
        Ok(list.actions)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}
