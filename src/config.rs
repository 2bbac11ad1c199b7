//! Configuration loading
//!
//! Reads a TOML file plus `ORACLE_*` environment overrides. `.env` is loaded
//! by the binary before this runs.

use crate::error::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub predictors: PredictorsConfig,
    /// LLM backend. Absent means every slot runs in permanent fallback mode.
    pub llm: Option<LlmConfig>,
}

impl Config {
    /// Load from a TOML file (optional) merged with environment variables
    /// prefixed `ORACLE_` (e.g. `ORACLE_SERVER__PORT=9000`).
    pub fn load(path: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ORACLE").separator("__"))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}

/// Upstream lottery feed
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Endpoint returning recent results, newest first
    pub url: String,
    #[serde(default = "default_feed_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_feed_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Seconds between scheduled ticks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Most recent entries fetched per tick
    #[serde(default = "default_snapshot_limit")]
    pub snapshot_limit: usize,
    /// Per-slot recent win/loss history capacity
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_snapshot_limit() -> usize {
    10
}

fn default_history_cap() -> usize {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            snapshot_limit: default_snapshot_limit(),
            history_cap: default_history_cap(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictorsConfig {
    /// One slot per name; ids are assigned 1..N in order
    #[serde(default = "default_slot_names")]
    pub names: Vec<String>,
}

fn default_slot_names() -> Vec<String> {
    (1..=5).map(|i| format!("ai-{}", i)).collect()
}

impl Default for PredictorsConfig {
    fn default() -> Self {
        Self {
            names: default_slot_names(),
        }
    }
}

/// LLM provider settings, one shared backend queried once per slot
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Per-slot call timeout; a timed-out slot falls back, never blocks the batch
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_timeout_secs() -> u64 {
    20
}
