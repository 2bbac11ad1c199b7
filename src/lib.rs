//! WinGo Prediction Oracle
//!
//! Polls a WinGo-style lottery feed, asks a pool of AI predictors to forecast
//! the next round's color/size category, and tracks per-predictor accuracy.
//!
//! ## Architecture
//!
//! ```text
//! Feed (HTTP scrape) → Normalizer → Period Engine → Predictor Pool (LLM)
//!                                        ↓
//!                                     Ledger (wins/losses/accuracy)
//!                                        ↓
//!                                  Status API (axum)
//! ```
//!
//! All mutation flows through the engine's serialized command loop; the HTTP
//! layer only reads copy-on-read snapshots and enqueues commands.

pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod predictor;
pub mod rules;
pub mod server;
pub mod types;
