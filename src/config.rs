//! Application configuration
//!
//! One YAML document with a section per concern. Every field has a default,
//! so an empty or partial file is valid.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use action_flow::EngineConfig;
use action_locator::KeywordTable;
use serde::{Deserialize, Serialize};
use surface_driver::WebDriverConfig;

use crate::apps::AppRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub locator: LocatorConfig,
    pub capture: CaptureConfig,
    pub oracle: OracleConfig,
    pub browser: WebDriverConfig,
    pub session: SessionConfig,
    /// Ordered host-substring rules naming the app under test
    pub apps: Vec<AppRule>,
    pub knowledge_base: KnowledgeBaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            locator: LocatorConfig::default(),
            capture: CaptureConfig::default(),
            oracle: OracleConfig::default(),
            browser: WebDriverConfig::default(),
            session: SessionConfig::default(),
            apps: AppRule::defaults(),
            knowledge_base: KnowledgeBaseConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Keyword rules consulted by the clickable keyword tier
    pub keywords: KeywordTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub dataset_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("dataset"),
        }
    }
}

/// OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Environment variable holding the API key; several keys may be
    /// comma-separated and are tried in order when rate limited
    pub api_key_env: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            timeout_secs: 60,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Keys read from `api_key_env`; empty when unset
    pub fn api_keys(&self) -> Vec<String> {
        env::var(&self.api_key_env)
            .map(|raw| split_keys(&raw))
            .unwrap_or_default()
    }
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub state_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let state_dir = dirs::home_dir()
            .map(|home| home.join(".softlight").join("state"))
            .unwrap_or_else(|| PathBuf::from(".softlight/state"));
        Self { state_dir }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub dir: PathBuf,
    /// Documents handed to the planning oracle
    pub top_k: usize,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("knowledge_base"),
            top_k: 2,
        }
    }
}
