//! Core types shared across the oracle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Size category of a WinGo digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Size {
    Big,
    Small,
}

impl Size {
    pub fn as_str(&self) -> &'static str {
        match self {
            Size::Big => "Big",
            Size::Small => "Small",
        }
    }

    /// Case-insensitive parse against the canonical vocabulary
    pub fn parse(s: &str) -> Option<Size> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("big") {
            Some(Size::Big)
        } else if s.eq_ignore_ascii_case("small") {
            Some(Size::Small)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Color category of a WinGo digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Green,
    Violet,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Red, Color::Green, Color::Violet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "Red",
            Color::Green => "Green",
            Color::Violet => "Violet",
        }
    }

    /// Case-insensitive parse against the canonical vocabulary
    pub fn parse(s: &str) -> Option<Color> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("red") {
            Some(Color::Red)
        } else if s.eq_ignore_ascii_case("green") {
            Some(Color::Green)
        } else if s.eq_ignore_ascii_case("violet") {
            Some(Color::Violet)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized feed result. Immutable once produced; the feed is consumed
/// newest-first, so index 0 of a snapshot is the most recent actual.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    /// Opaque round identifier (issue number)
    pub period_id: String,
    /// Winning digit, 0-9
    pub number: u8,
    /// Color as reported by the feed, if any
    pub color: Option<String>,
}

/// A color/size forecast for one upcoming round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forecast {
    pub color: Color,
    pub size: Size,
}

/// Identity of one predictor slot in the pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotIdentity {
    pub id: u32,
    pub name: String,
}

/// One slot's forecast within a batch
#[derive(Debug, Clone, Serialize)]
pub struct SlotForecast {
    pub slot_id: u32,
    pub name: String,
    pub forecast: Forecast,
}

/// One outstanding batch of forecasts for the upcoming round.
///
/// At most one batch is pending system-wide; it is replaced wholesale each
/// cycle and marked compared exactly once when the next actual arrives.
#[derive(Debug, Clone, Serialize)]
pub struct PendingBatch {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub forecasts: Vec<SlotForecast>,
    pub compared_at: Option<DateTime<Utc>>,
}

impl PendingBatch {
    pub fn new(forecasts: Vec<SlotForecast>) -> Self {
        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            forecasts,
            compared_at: None,
        }
    }
}
