//! Period lifecycle engine
//!
//! The one writer in the system. Each tick pulls a feed snapshot, detects
//! whether a new actual has materialized, reconciles the outstanding batch
//! exactly once, rotates the period marker and solicits fresh forecasts.
//!
//! Scheduled ticks and forced resolicitations are serialized through a single
//! command channel, so only one engine mutation runs at a time. Status reads
//! clone under a read lock and never observe a half-updated ledger.

use crate::error::{OracleError, Result};
use crate::feed::FeedSource;
use crate::ledger::{Ledger, SlotSummary};
use crate::predictor::PredictorPool;
use crate::rules;
use crate::types::{Color, Forecast, PendingBatch, ResultEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};

/// What a tick did, for logging and tests
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Empty snapshot; nothing changed, retry next tick
    FeedUnavailable,
    /// First non-empty snapshot: marker set, first batch solicited
    Initialized,
    /// New actual reconciled and a fresh batch solicited
    Reconciled { judged: usize, wins: usize },
    /// Same period but no batch was pending; solicited without judging
    Resolicited,
    /// Same period, batch already pending
    Idle,
}

/// Copy-on-read projection for the HTTP layer
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub period_marker: Option<String>,
    pub snapshot: Vec<ResultEntry>,
    pub pending_batch: Option<PendingBatch>,
    pub predictors: Vec<SlotSummary>,
    pub server_time: DateTime<Utc>,
}

/// Result of a forced resolicitation
#[derive(Debug, Clone, Serialize)]
pub struct ResolicitResponse {
    pub batch: PendingBatch,
    pub snapshot: Vec<ResultEntry>,
}

struct EngineState {
    /// Period id of the most recently reconciled actual; `None` until the
    /// first non-empty snapshot
    marker: Option<String>,
    ledger: Ledger,
    pending: Option<PendingBatch>,
    cached_snapshot: Vec<ResultEntry>,
}

enum Decision {
    Initialize,
    Reconcile,
    Resolicit,
    Noop,
}

pub struct PeriodEngine {
    feed: Arc<dyn FeedSource>,
    pool: PredictorPool,
    state: RwLock<EngineState>,
    snapshot_limit: usize,
}

impl PeriodEngine {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        pool: PredictorPool,
        history_cap: usize,
        snapshot_limit: usize,
    ) -> Self {
        let ledger = Ledger::new(pool.slots(), history_cap);
        Self {
            feed,
            pool,
            state: RwLock::new(EngineState {
                marker: None,
                ledger,
                pending: None,
                cached_snapshot: Vec::new(),
            }),
            snapshot_limit,
        }
    }

    /// One engine cycle. Never fails: feed problems degrade to a no-op and
    /// predictor problems degrade per-slot inside the pool.
    pub async fn tick(&self) -> TickOutcome {
        let snapshot = match self.feed.fetch_snapshot(self.snapshot_limit).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Feed fetch failed: {}", e);
                Vec::new()
            }
        };

        if snapshot.is_empty() {
            debug!("Feed unavailable, retrying next tick");
            return TickOutcome::FeedUnavailable;
        }

        let newest = snapshot[0].clone();

        let decision = {
            let state = self.state.read().await;
            match &state.marker {
                None => Decision::Initialize,
                Some(marker) if *marker != newest.period_id => Decision::Reconcile,
                Some(_) if state.pending.is_none() => Decision::Resolicit,
                Some(_) => Decision::Noop,
            }
        };

        match decision {
            Decision::Initialize => {
                let batch = self.pool.forecast_batch(&snapshot).await;
                let mut state = self.state.write().await;
                state.marker = Some(newest.period_id.clone());
                install_batch(&mut state, batch, snapshot);
                info!("Initialized at period {}", newest.period_id);
                TickOutcome::Initialized
            }
            Decision::Reconcile => {
                // Solicit before taking the write lock; the commit below is
                // the only section a status read can contend with.
                let next_batch = self.pool.forecast_batch(&snapshot).await;
                let actual = actual_forecast(&newest);

                let mut state = self.state.write().await;
                let mut judged = 0;
                let mut wins = 0;
                let slot_ids: Vec<u32> =
                    state.ledger.records().iter().map(|r| r.slot_id).collect();
                for slot_id in slot_ids {
                    if let Some(win) = state.ledger.judge(slot_id, actual) {
                        judged += 1;
                        if win {
                            wins += 1;
                        }
                    }
                }
                if let Some(batch) = state.pending.as_mut() {
                    batch.compared_at = Some(Utc::now());
                }
                state.marker = Some(newest.period_id.clone());
                install_batch(&mut state, next_batch, snapshot);
                info!(
                    "Reconciled period {} ({} actual {}/{}): {}/{} slots won",
                    newest.period_id,
                    newest.number,
                    actual.color,
                    actual.size,
                    wins,
                    judged
                );
                TickOutcome::Reconciled { judged, wins }
            }
            Decision::Resolicit => {
                warn!("No pending batch for current period, soliciting");
                let batch = self.pool.forecast_batch(&snapshot).await;
                let mut state = self.state.write().await;
                install_batch(&mut state, batch, snapshot);
                TickOutcome::Resolicited
            }
            Decision::Noop => {
                let mut state = self.state.write().await;
                state.cached_snapshot = snapshot;
                TickOutcome::Idle
            }
        }
    }

    /// Out-of-band fetch+solicit cycle. Unlike `tick`, an unavailable feed is
    /// reported to the caller.
    pub async fn resolicit(&self) -> Result<ResolicitResponse> {
        let snapshot = self.feed.fetch_snapshot(self.snapshot_limit).await?;
        if snapshot.is_empty() {
            return Err(OracleError::Api("Feed returned no usable entries".into()));
        }

        let batch = self.pool.forecast_batch(&snapshot).await;
        let response = ResolicitResponse {
            batch: batch.clone(),
            snapshot: snapshot.clone(),
        };

        let mut state = self.state.write().await;
        if state.marker.is_none() {
            state.marker = Some(snapshot[0].period_id.clone());
        }
        install_batch(&mut state, batch, snapshot);
        Ok(response)
    }

    /// Copy-on-read status projection
    pub async fn status(&self) -> StatusSnapshot {
        let state = self.state.read().await;
        StatusSnapshot {
            period_marker: state.marker.clone(),
            snapshot: state.cached_snapshot.clone(),
            pending_batch: state.pending.clone(),
            predictors: state.ledger.rank(),
            server_time: Utc::now(),
        }
    }
}

/// Record the batch in the ledger and replace the pending batch wholesale
fn install_batch(state: &mut EngineState, batch: PendingBatch, snapshot: Vec<ResultEntry>) {
    for forecast in &batch.forecasts {
        state.ledger.record_prediction(forecast.slot_id, forecast.forecast);
    }
    state.pending = Some(batch);
    state.cached_snapshot = snapshot;
}

/// Actual categories for a result entry: the feed's color when it parses,
/// otherwise derived from the digit; size always derived.
fn actual_forecast(entry: &ResultEntry) -> Forecast {
    let color = entry
        .color
        .as_deref()
        .and_then(Color::parse)
        .unwrap_or_else(|| rules::color_of(entry.number));
    Forecast {
        color,
        size: rules::size_of(entry.number),
    }
}

/// Commands consumed by the serialized engine loop
pub enum EngineCommand {
    Tick,
    Resolicit {
        reply: oneshot::Sender<Result<ResolicitResponse>>,
    },
}

/// Spawn the interval trigger and the single consumer task. Both scheduled
/// ticks and forced resolicitations flow through the returned sender, so
/// engine mutations never overlap; a tick still in progress delays the next
/// trigger instead of running concurrently with it.
pub fn spawn_scheduler(
    engine: Arc<PeriodEngine>,
    poll_interval: Duration,
) -> mpsc::Sender<EngineCommand> {
    let (tx, mut rx) = mpsc::channel::<EngineCommand>(16);

    let tick_tx = tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if tick_tx.send(EngineCommand::Tick).await.is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                EngineCommand::Tick => {
                    let outcome = engine.tick().await;
                    debug!("Tick outcome: {:?}", outcome);
                }
                EngineCommand::Resolicit { reply } => {
                    let _ = reply.send(engine.resolicit().await);
                }
            }
        }
    });

    tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::ForecastBackend;
    use crate::types::{Size, SlotIdentity};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Feed returning scripted snapshots in order, then empty
    struct FakeFeed {
        snapshots: Mutex<VecDeque<Vec<ResultEntry>>>,
    }

    impl FakeFeed {
        fn new(snapshots: Vec<Vec<ResultEntry>>) -> Arc<Self> {
            Arc::new(Self {
                snapshots: Mutex::new(snapshots.into()),
            })
        }
    }

    #[async_trait]
    impl FeedSource for FakeFeed {
        async fn fetch_snapshot(&self, _limit: usize) -> Result<Vec<ResultEntry>> {
            Ok(self
                .snapshots
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }
    }

    /// Backend that always answers Red/Big
    struct RedBigBackend;

    #[async_trait]
    impl ForecastBackend for RedBigBackend {
        async fn predict(
            &self,
            _slot: &SlotIdentity,
            _history: &[ResultEntry],
        ) -> Result<String> {
            Ok(r#"{"color": "Red", "size": "Big"}"#.to_string())
        }
    }

    fn entry(period: &str, number: u8) -> ResultEntry {
        ResultEntry {
            period_id: period.to_string(),
            number,
            color: None,
        }
    }

    fn engine_with(snapshots: Vec<Vec<ResultEntry>>) -> PeriodEngine {
        let names: Vec<String> = (1..=3).map(|i| format!("ai-{}", i)).collect();
        let pool = PredictorPool::new(&names, Arc::new(RedBigBackend));
        PeriodEngine::new(FakeFeed::new(snapshots), pool, 10, 10)
    }

    #[tokio::test]
    async fn test_empty_feed_stays_uninitialized() {
        let engine = engine_with(vec![vec![]]);
        assert_eq!(engine.tick().await, TickOutcome::FeedUnavailable);

        let status = engine.status().await;
        assert!(status.period_marker.is_none());
        assert!(status.pending_batch.is_none());
    }

    #[tokio::test]
    async fn test_first_snapshot_initializes_without_judging() {
        let engine = engine_with(vec![vec![entry("P1", 4)]]);
        assert_eq!(engine.tick().await, TickOutcome::Initialized);

        let status = engine.status().await;
        assert_eq!(status.period_marker.as_deref(), Some("P1"));
        let batch = status.pending_batch.expect("batch solicited");
        assert_eq!(batch.forecasts.len(), 3);
        assert!(batch.compared_at.is_none());
        // No ledger mutation beyond the recorded predictions
        for p in &status.predictors {
            assert_eq!(p.wins + p.losses, 0);
            assert!(p.last_prediction.is_some());
        }
    }

    #[tokio::test]
    async fn test_new_period_reconciles_once() {
        // Every slot predicts Red/Big; P2's outcome 7 is Green/Big, so every
        // slot records exactly one loss.
        let engine = engine_with(vec![
            vec![entry("P1", 4)],
            vec![entry("P2", 7), entry("P1", 4)],
        ]);
        engine.tick().await;
        let outcome = engine.tick().await;
        assert_eq!(outcome, TickOutcome::Reconciled { judged: 3, wins: 0 });

        let status = engine.status().await;
        assert_eq!(status.period_marker.as_deref(), Some("P2"));
        for p in &status.predictors {
            assert_eq!(p.losses, 1);
            assert_eq!(p.wins, 0);
            assert_eq!(p.recent, vec![0]);
            // A fresh batch was solicited right after reconciling
            assert!(p.last_prediction.is_some());
        }
    }

    #[tokio::test]
    async fn test_matching_prediction_counts_as_win() {
        // P2's outcome 8 is Red/Big, matching the scripted forecasts
        let engine = engine_with(vec![
            vec![entry("P1", 4)],
            vec![entry("P2", 8), entry("P1", 4)],
        ]);
        engine.tick().await;
        let outcome = engine.tick().await;
        assert_eq!(outcome, TickOutcome::Reconciled { judged: 3, wins: 3 });

        let status = engine.status().await;
        for p in &status.predictors {
            assert_eq!(p.wins, 1);
            assert_eq!(p.recent, vec![1]);
        }
    }

    #[test]
    fn test_feed_color_overrides_derived_color() {
        // Digit 0 derives Red, but the feed says green; predictions of
        // Red/Small must lose on color.
        let actual = actual_forecast(&ResultEntry {
            period_id: "P2".to_string(),
            number: 0,
            color: Some("green".to_string()),
        });
        assert_eq!(actual.color, Color::Green);
        assert_eq!(actual.size, Size::Small);
    }

    #[tokio::test]
    async fn test_same_period_never_rejudges() {
        let engine = engine_with(vec![
            vec![entry("P1", 4)],
            vec![entry("P2", 7), entry("P1", 4)],
            vec![entry("P2", 7), entry("P1", 4)],
            vec![entry("P2", 7), entry("P1", 4)],
        ]);
        engine.tick().await;
        engine.tick().await;
        assert_eq!(engine.tick().await, TickOutcome::Idle);
        assert_eq!(engine.tick().await, TickOutcome::Idle);

        let status = engine.status().await;
        for p in &status.predictors {
            assert_eq!(p.wins + p.losses, 1);
        }
    }

    #[tokio::test]
    async fn test_missing_batch_triggers_defensive_resolicit() {
        let engine = engine_with(vec![
            vec![entry("P1", 4)],
            vec![entry("P1", 4)],
        ]);
        engine.tick().await;

        // Simulate a prior partial failure that lost the batch
        engine.state.write().await.pending = None;

        assert_eq!(engine.tick().await, TickOutcome::Resolicited);
        let status = engine.status().await;
        assert!(status.pending_batch.is_some());
        // Defensive path solicits without judging
        for p in &status.predictors {
            assert_eq!(p.wins + p.losses, 0);
        }
    }

    #[tokio::test]
    async fn test_forced_resolicit_returns_batch_and_snapshot() {
        let engine = engine_with(vec![vec![entry("P1", 4)]]);
        let response = engine.resolicit().await.unwrap();
        assert_eq!(response.batch.forecasts.len(), 3);
        assert_eq!(response.snapshot[0].period_id, "P1");

        let status = engine.status().await;
        assert_eq!(status.period_marker.as_deref(), Some("P1"));
        assert!(status.pending_batch.is_some());
    }

    #[tokio::test]
    async fn test_forced_resolicit_with_empty_feed_is_error() {
        let engine = engine_with(vec![]);
        assert!(engine.resolicit().await.is_err());
    }

    #[tokio::test]
    async fn test_scheduler_serializes_forced_resolicit() {
        // Two identical snapshots so the order of the immediate scheduled
        // tick and the forced command does not matter
        let engine = Arc::new(engine_with(vec![
            vec![entry("P1", 4)],
            vec![entry("P1", 4)],
        ]));
        // Long interval so only the immediate first tick fires on its own
        let tx = spawn_scheduler(engine.clone(), Duration::from_secs(3600));

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(EngineCommand::Resolicit { reply: reply_tx })
            .await
            .unwrap();
        let response = reply_rx.await.unwrap().unwrap();
        assert_eq!(response.snapshot[0].period_id, "P1");
    }
}
