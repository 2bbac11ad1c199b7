//! Predictor pool
//!
//! A fixed set of named slots, each asking the backend for a color/size
//! forecast. `forecast_batch` never fails and never blocks on one slow slot:
//! every backend error or timeout degrades that slot to a uniform random
//! digit passed through the category rules.

pub mod backend;

pub use backend::{DisabledBackend, ForecastBackend, LlmBackend};

use crate::rules;
use crate::types::{Color, Forecast, PendingBatch, ResultEntry, Size, SlotForecast, SlotIdentity};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct PredictorPool {
    slots: Vec<SlotIdentity>,
    backend: Arc<dyn ForecastBackend>,
    slot_timeout: Duration,
}

impl PredictorPool {
    pub fn new(names: &[String], backend: Arc<dyn ForecastBackend>) -> Self {
        let slots = names
            .iter()
            .enumerate()
            .map(|(i, name)| SlotIdentity {
                id: i as u32 + 1,
                name: name.clone(),
            })
            .collect();

        Self {
            slots,
            backend,
            slot_timeout: Duration::from_secs(25),
        }
    }

    pub fn with_slot_timeout(mut self, timeout: Duration) -> Self {
        self.slot_timeout = timeout;
        self
    }

    pub fn slots(&self) -> &[SlotIdentity] {
        &self.slots
    }

    /// Query every slot concurrently and join on all of them. Always returns
    /// one well-formed forecast per slot.
    pub async fn forecast_batch(&self, history: &[ResultEntry]) -> PendingBatch {
        let futures = self
            .slots
            .iter()
            .map(|slot| self.forecast_slot(slot, history));
        let forecasts = futures_util::future::join_all(futures).await;
        PendingBatch::new(forecasts)
    }

    async fn forecast_slot(&self, slot: &SlotIdentity, history: &[ResultEntry]) -> SlotForecast {
        let outcome = tokio::time::timeout(
            self.slot_timeout,
            self.backend.predict(slot, history),
        )
        .await;

        let forecast = match outcome {
            Ok(Ok(raw)) => interpret_response(&raw).unwrap_or_else(|| {
                debug!("Slot {} returned unusable output, falling back", slot.name);
                random_forecast()
            }),
            Ok(Err(e)) => {
                debug!("Slot {} backend error: {}, falling back", slot.name, e);
                random_forecast()
            }
            Err(_) => {
                warn!("Slot {} timed out, falling back", slot.name);
                random_forecast()
            }
        };

        SlotForecast {
            slot_id: slot.id,
            name: slot.name.clone(),
            forecast,
        }
    }
}

/// Interpretation order, first match wins: strict JSON parse, vocabulary
/// substring scan, first digit character. `None` means fall back to random.
fn interpret_response(raw: &str) -> Option<Forecast> {
    if let Some(forecast) = parse_structured(raw) {
        return Some(forecast);
    }
    if let Some(forecast) = scan_vocabulary(raw) {
        return Some(forecast);
    }
    raw.chars()
        .find(|c| c.is_ascii_digit())
        .map(|c| rules::forecast_for(c as u8 - b'0'))
}

fn parse_structured(raw: &str) -> Option<Forecast> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(&raw[start..=end]).ok()?;
    let color = Color::parse(value.get("color")?.as_str()?)?;
    let size = Size::parse(value.get("size")?.as_str()?)?;
    Some(Forecast { color, size })
}

fn scan_vocabulary(raw: &str) -> Option<Forecast> {
    let lower = raw.to_lowercase();

    let color = Color::ALL
        .iter()
        .filter_map(|c| lower.find(&c.as_str().to_lowercase()).map(|pos| (pos, *c)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, c)| c)?;

    let size = [Size::Big, Size::Small]
        .iter()
        .filter_map(|s| lower.find(&s.as_str().to_lowercase()).map(|pos| (pos, *s)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, s)| s)?;

    Some(Forecast { color, size })
}

fn random_forecast() -> Forecast {
    let digit: u8 = rand::rng().random_range(0..=9);
    rules::forecast_for(digit)
}
