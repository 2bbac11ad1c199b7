//! Prediction ledger
//!
//! Per-slot win/loss counts, a bounded recent-outcome history and the single
//! prediction awaiting judgement. Records live for the process lifetime and
//! are mutated only by the engine's reconciliation step.

use crate::types::{Forecast, SlotIdentity};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;

/// Mutable per-slot record
#[derive(Debug, Clone, Serialize)]
pub struct SlotRecord {
    pub slot_id: u32,
    pub name: String,
    pub wins: u64,
    pub losses: u64,
    /// 1 = win, 0 = loss, most recent first, capped at the history capacity
    pub recent: VecDeque<u8>,
    pub last_prediction: Option<Forecast>,
    pub last_judgement: Option<bool>,
}

impl SlotRecord {
    fn new(slot: &SlotIdentity) -> Self {
        Self {
            slot_id: slot.id,
            name: slot.name.clone(),
            wins: 0,
            losses: 0,
            recent: VecDeque::new(),
            last_prediction: None,
            last_judgement: None,
        }
    }

    /// wins / (wins + losses), zero before any judgement
    pub fn accuracy(&self) -> Decimal {
        let total = self.wins + self.losses;
        if total == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(self.wins) / Decimal::from(total)
        }
    }
}

/// Read-only ranked summary of one slot
#[derive(Debug, Clone, Serialize)]
pub struct SlotSummary {
    pub slot_id: u32,
    pub name: String,
    pub wins: u64,
    pub losses: u64,
    pub accuracy: Decimal,
    pub recent: Vec<u8>,
    pub last_prediction: Option<Forecast>,
    pub last_judgement: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    records: Vec<SlotRecord>,
    history_cap: usize,
}

impl Ledger {
    pub fn new(slots: &[SlotIdentity], history_cap: usize) -> Self {
        Self {
            records: slots.iter().map(SlotRecord::new).collect(),
            history_cap,
        }
    }

    pub fn records(&self) -> &[SlotRecord] {
        &self.records
    }

    fn record_mut(&mut self, slot_id: u32) -> Option<&mut SlotRecord> {
        self.records.iter_mut().find(|r| r.slot_id == slot_id)
    }

    /// Overwrite the slot's pending prediction and reset its judgement
    pub fn record_prediction(&mut self, slot_id: u32, forecast: Forecast) {
        if let Some(record) = self.record_mut(slot_id) {
            record.last_prediction = Some(forecast);
            record.last_judgement = None;
        }
    }

    /// Judge the slot's pending prediction against the actual. A win requires
    /// both color and size to match; partial matches are losses. Returns
    /// `None` when the slot has nothing awaiting judgement.
    pub fn judge(&mut self, slot_id: u32, actual: Forecast) -> Option<bool> {
        let cap = self.history_cap;
        let record = self.record_mut(slot_id)?;
        let prediction = record.last_prediction.take()?;

        let win = prediction == actual;
        if win {
            record.wins += 1;
        } else {
            record.losses += 1;
        }

        record.recent.push_front(u8::from(win));
        record.recent.truncate(cap);
        record.last_judgement = Some(win);
        Some(win)
    }

    /// Summaries sorted by descending accuracy, ties by ascending slot id.
    /// Deterministic for unchanged ledger state.
    pub fn rank(&self) -> Vec<SlotSummary> {
        let mut summaries: Vec<SlotSummary> = self
            .records
            .iter()
            .map(|r| SlotSummary {
                slot_id: r.slot_id,
                name: r.name.clone(),
                wins: r.wins,
                losses: r.losses,
                accuracy: r.accuracy(),
                recent: r.recent.iter().copied().collect(),
                last_prediction: r.last_prediction,
                last_judgement: r.last_judgement,
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.accuracy
                .cmp(&a.accuracy)
                .then(a.slot_id.cmp(&b.slot_id))
        });
        summaries
    }
}
