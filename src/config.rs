use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// `*` allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub insights_max_tokens: u32,
    pub chat_max_tokens: u32,
}

impl LLMConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub patients_path: PathBuf,
    pub biomarkers_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            server: ServerConfig {
                port: var("PORT", "3000")
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: var("HOST", "0.0.0.0"),
                cors_allowed_origins: var("ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            llm: LLMConfig {
                provider: var("LLM_PROVIDER", "openai"),
                api_key: lookup("OPENAI_API_KEY")
                    .or_else(|| lookup("LLM_API_KEY"))
                    .unwrap_or_default(),
                model: var("LLM_MODEL", "gpt-3.5-turbo"),
                base_url: lookup("LLM_BASE_URL").filter(|s| !s.trim().is_empty()),
                temperature: var("LLM_TEMPERATURE", "0.7")
                    .parse()
                    .context("LLM_TEMPERATURE must be a number")?,
                insights_max_tokens: var("INSIGHTS_MAX_TOKENS", "800")
                    .parse()
                    .context("INSIGHTS_MAX_TOKENS must be a positive integer")?,
                chat_max_tokens: var("CHAT_MAX_TOKENS", "1000")
                    .parse()
                    .context("CHAT_MAX_TOKENS must be a positive integer")?,
            },
            data: DataConfig {
                patients_path: var("PATIENTS_DATA_PATH", "data/seeder_patients.json").into(),
                biomarkers_path: var("BIOMARKERS_DATA_PATH", "data/seeder_biomarkers.json").into(),
            },
        })
    }
}
