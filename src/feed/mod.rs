//! Lottery feed client and payload normalization
//!
//! The upstream feed's JSON shape is not stable, so the client fetches a raw
//! payload and the normalizer sniffs it into typed entries. An empty snapshot
//! means "feed temporarily unavailable" and is handled by the engine, not
//! surfaced as an error.

pub mod normalize;

use crate::config::FeedConfig;
use crate::error::Result;
use crate::types::ResultEntry;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Injected "fetch current feed snapshot" capability
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Most recent entries, newest first, at most `limit`
    async fn fetch_snapshot(&self, limit: usize) -> Result<Vec<ResultEntry>>;
}

/// HTTP feed client
#[derive(Clone)]
pub struct FeedClient {
    http: Client,
    url: String,
}

impl FeedClient {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch_snapshot(&self, limit: usize) -> Result<Vec<ResultEntry>> {
        let payload: serde_json::Value = self
            .http
            .get(&self.url)
            .query(&[("pageSize", limit.to_string())])
            .send()
            .await?
            .json()
            .await?;

        let entries = normalize::normalize(&payload, limit);
        debug!("Feed returned {} usable entries", entries.len());
        Ok(entries)
    }
}
