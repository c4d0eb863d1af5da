//! Validated order book snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PriceLevel, Side};

/// Immutable, validated order book snapshot.
///
/// Both sides are ordered best-first. Only [`SnapshotValidator`] builds these
/// from wire payloads, so every accepted snapshot has parsed, finite levels.
///
/// [`SnapshotValidator`]: crate::SnapshotValidator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Exchange timestamp of the snapshot
    pub timestamp: DateTime<Utc>,
    /// Bid levels (price descending)
    pub bids: Vec<PriceLevel>,
    /// Ask levels (price ascending)
    pub asks: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    /// Create a new snapshot from already-typed levels
    pub fn new(timestamp: DateTime<Utc>, bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self {
            timestamp,
            bids,
            asks,
        }
    }

    /// Best (highest) bid level
    #[inline]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Best (lowest) ask level
    #[inline]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Levels a taker on `side` would consume (asks for buys, bids for sells)
    #[inline]
    pub fn liquidity_for(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }

    /// Sum of quantities over `levels[start..end]`, clamped to what exists
    pub fn quantity_in_range(levels: &[PriceLevel], start: usize, end: usize) -> f64 {
        let end = end.min(levels.len());
        if start >= end {
            return 0.0;
        }
        levels[start..end].iter().map(|l| l.quantity).sum()
    }

    /// Sum of bid and ask quantities over levels `start..end` of both sides
    pub fn two_sided_quantity(&self, start: usize, end: usize) -> f64 {
        Self::quantity_in_range(&self.bids, start, end)
            + Self::quantity_in_range(&self.asks, start, end)
    }

    /// Number of levels on the shallower side
    pub fn depth(&self) -> usize {
        self.bids.len().min(self.asks.len())
    }
}
