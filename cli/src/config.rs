use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub planner: PlannerConfig,
}

/// Connection settings for the natural-language planner, read from the
/// environment. Missing pieces are fine: the propose call fails fast and
/// plan generation falls back to the deterministic scheduler.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "sprout").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("sprout.db");

        Ok(Config {
            db_path,
            data_dir,
            planner: PlannerConfig::from_env(),
        })
    }
}

impl PlannerConfig {
    pub fn from_env() -> Self {
        let endpoint = std::env::var("SPROUT_PLANNER_URL")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let model =
            std::env::var("SPROUT_PLANNER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_key = std::env::var("SPROUT_PLANNER_API_KEY").ok().filter(|k| !k.is_empty());
        let timeout_secs = std::env::var("SPROUT_PLANNER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            endpoint,
            model,
            api_key,
            timeout_secs,
        }
    }
}
