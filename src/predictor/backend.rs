//! LLM forecast backend
//!
//! One OpenAI-compatible chat-completions call per slot. Failures here are
//! never fatal; the pool degrades each failed slot to a random forecast.

use crate::config::LlmConfig;
use crate::error::{OracleError, Result};
use crate::rules;
use crate::types::{ResultEntry, SlotIdentity};
use async_trait::async_trait;
use reqwest::Client;

/// Injected "request a category prediction" capability
#[async_trait]
pub trait ForecastBackend: Send + Sync {
    /// Raw model output for one slot; any error funnels into the fallback path
    async fn predict(&self, slot: &SlotIdentity, history: &[ResultEntry]) -> Result<String>;
}

/// Chat-completions backend, provider resolved from config
pub struct LlmBackend {
    http: Client,
    config: LlmConfig,
}

impl LlmBackend {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    fn resolve_endpoint(&self) -> (String, String) {
        match self.config.provider.to_lowercase().as_str() {
            "deepseek" => (
                "https://api.deepseek.com".to_string(),
                self.config
                    .model
                    .clone()
                    .unwrap_or_else(|| "deepseek-chat".to_string()),
            ),
            "openai" | "gpt" => (
                self.config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com".to_string()),
                self.config
                    .model
                    .clone()
                    .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            ),
            "ollama" => (
                self.config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string()),
                self.config
                    .model
                    .clone()
                    .unwrap_or_else(|| "qwen2.5:14b".to_string()),
            ),
            _ => (
                self.config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.deepseek.com".to_string()),
                self.config
                    .model
                    .clone()
                    .unwrap_or_else(|| "deepseek-chat".to_string()),
            ),
        }
    }
}

#[async_trait]
impl ForecastBackend for LlmBackend {
    async fn predict(&self, slot: &SlotIdentity, history: &[ResultEntry]) -> Result<String> {
        // Ollama runs locally without a key; hosted providers need one.
        let needs_key = self.config.provider.to_lowercase() != "ollama";
        if needs_key && self.config.api_key.is_empty() {
            return Err(OracleError::Api("No API key configured".into()));
        }

        let (base_url, model) = self.resolve_endpoint();
        let prompt = build_prompt(slot, history);

        let request = serde_json::json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "response_format": {"type": "json_object"}
        });

        let mut req = self
            .http
            .post(format!("{}/v1/chat/completions", base_url))
            .header("content-type", "application/json");

        if !self.config.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let resp: serde_json::Value = req.json(&request).send().await?.json().await?;

        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| OracleError::Api("Empty LLM response".into()))
    }
}

/// Backend used when no LLM is configured: every call errors, so every slot
/// runs in permanent random-fallback mode.
pub struct DisabledBackend;

#[async_trait]
impl ForecastBackend for DisabledBackend {
    async fn predict(&self, _slot: &SlotIdentity, _history: &[ResultEntry]) -> Result<String> {
        Err(OracleError::Api("LLM backend not configured".into()))
    }
}

fn build_prompt(slot: &SlotIdentity, history: &[ResultEntry]) -> String {
    let mut lines = String::new();
    for entry in history {
        let derived = rules::forecast_for(entry.number);
        let color = entry.color.clone().unwrap_or_else(|| derived.color.to_string());
        lines.push_str(&format!(
            "period {}: number {} ({}, {})\n",
            entry.period_id, entry.number, color, derived.size
        ));
    }

    format!(
        r#"You are predictor "{}" for a WinGo-style lottery. Digits 0-9 map to
color Red (0,2,4,6,8), Green (1,3,5,7) or Violet (9), and size Small (0-4) or Big (5-9).

Recent results, newest first:
{}
Predict the color and size category of the NEXT round. Respond with JSON:
{{"color": "Red|Green|Violet", "size": "Big|Small"}}

Only valid JSON, no other text."#,
        slot.name, lines
    )
}
