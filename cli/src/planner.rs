use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use sprout_core::planner::PlanProposalProvider;

const SYSTEM_PROMPT: &str = "You are a baby-feeding planner. Respond with exactly one JSON array \
                             matching the requested shape and nothing else.";

/// OpenAI-compatible chat client backing the plan proposal path.
///
/// Owns its own runtime so the synchronous provider trait can block on the
/// request; the rest of the CLI never touches async code.
pub struct PlannerClient {
    client: reqwest::Client,
    rt: tokio::runtime::Runtime,
    config: PlannerConfig,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl PlannerClient {
    pub fn new(config: PlannerConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "sprout-cli/{} (feeding tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        let rt = tokio::runtime::Runtime::new().expect("Failed to start async runtime");
        Self { client, rt, config }
    }

    async fn propose_async(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = &self.config.api_key else {
            bail!("No planner API key configured (set SPROUT_PLANNER_API_KEY)");
        };

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach the planner endpoint")?;

        if !resp.status().is_success() {
            let status = resp.status();
            bail!("Planner endpoint returned HTTP {status}");
        }

        let data: ChatResponse = resp
            .json()
            .await
            .context("Failed to parse the planner response")?;

        let content = data
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("Planner response has no choices")?;

        Ok(content)
    }
}

impl PlanProposalProvider for PlannerClient {
    fn propose(&self, prompt: &str) -> Result<String> {
        self.rt.block_on(self.propose_async(prompt))
    }
}

/// Provider used by `--offline`: every propose call fails immediately, so
/// generation goes straight to the deterministic scheduler.
pub struct OfflineProvider;

impl PlanProposalProvider for OfflineProvider {
    fn propose(&self, _prompt: &str) -> Result<String> {
        bail!("Planner disabled (--offline)")
    }
}
