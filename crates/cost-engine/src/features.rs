//! Market Microstructure Features
//!
//! Pure functions over one or two snapshots (plus a history window). The
//! same functions feed training-set construction and live inference, so a
//! model always sees features computed identically in both paths.
//!
//! # Features
//!
//! ```text
//! spread        = (ask₀ − bid₀) / mid
//! imbalance     = (Σbid − Σask) / (Σbid + Σask)           top `depth` levels
//! depth_ratio   = Σqty[5..20] / (Σqty[0..5] + ε)           both sides
//! price_change  = (mid(cur) − mid(prev)) / mid(prev)
//! volume_ratio  = Σtop5(cur) / (Σtop5(prev) + ε)           both sides
//! spread_change = spread(cur) / (spread(prev) + ε)
//! volatility    = std(Δ ln mid) × √periods                 last `window` snapshots
//! ```

use serde::{Deserialize, Serialize};
use tradecost_core::OrderBookSnapshot;

use crate::config::FeatureConfig;
use crate::history::HistoryStore;

/// Guard against division by zero in ratio features
pub const EPSILON: f64 = 1e-6;

/// Mid price; 0 unless both best levels exist with positive prices
#[inline]
pub fn mid_price(s: &OrderBookSnapshot) -> f64 {
    match (s.best_bid(), s.best_ask()) {
        (Some(bid), Some(ask)) if bid.price > 0.0 && ask.price > 0.0 => {
            (ask.price + bid.price) / 2.0
        }
        _ => 0.0,
    }
}

/// Relative bid-ask spread; 0 if mid ≤ 0
#[inline]
pub fn spread(s: &OrderBookSnapshot) -> f64 {
    let mid = mid_price(s);
    if mid <= 0.0 {
        return 0.0;
    }
    match (s.best_bid(), s.best_ask()) {
        (Some(bid), Some(ask)) => (ask.price - bid.price) / mid,
        _ => 0.0,
    }
}

/// Order book imbalance in [-1, 1] over the top `depth` levels each side
pub fn imbalance(s: &OrderBookSnapshot, depth: usize) -> f64 {
    if mid_price(s) <= 0.0 {
        return 0.0;
    }
    let bids = OrderBookSnapshot::quantity_in_range(&s.bids, 0, depth);
    let asks = OrderBookSnapshot::quantity_in_range(&s.asks, 0, depth);
    let total = bids + asks;
    if total <= 0.0 {
        return 0.0;
    }
    (bids - asks) / total
}

/// Deep (levels 5..20) to immediate (levels 0..5) liquidity, both sides
pub fn depth_ratio(s: &OrderBookSnapshot) -> f64 {
    let immediate = s.two_sided_quantity(0, 5);
    let deep = s.two_sided_quantity(5, 20);
    deep / (immediate + EPSILON)
}

/// Relative mid change between two snapshots.
///
/// Zero until `history_len` reaches `min_history`, or when mid(prev) ≤ 0.
pub fn price_change(
    current: &OrderBookSnapshot,
    previous: &OrderBookSnapshot,
    history_len: usize,
    min_history: usize,
) -> f64 {
    if history_len < min_history {
        return 0.0;
    }
    let prev_mid = mid_price(previous);
    if prev_mid <= 0.0 {
        return 0.0;
    }
    (mid_price(current) - prev_mid) / prev_mid
}

/// Top-5 two-sided volume of `current` relative to `previous`
pub fn volume_ratio(current: &OrderBookSnapshot, previous: &OrderBookSnapshot) -> f64 {
    current.two_sided_quantity(0, 5) / (previous.two_sided_quantity(0, 5) + EPSILON)
}

/// Spread of `current` relative to `previous`
pub fn spread_change(current: &OrderBookSnapshot, previous: &OrderBookSnapshot) -> f64 {
    spread(current) / (spread(previous) + EPSILON)
}

/// Annualised population std-dev of log mid returns.
///
/// Snapshots with non-positive mid are skipped. Returns 0 with fewer than
/// two usable prices. Single pass, no allocation.
pub fn realized_volatility<'a, I>(snapshots: I, annualization_factor: f64) -> f64
where
    I: IntoIterator<Item = &'a OrderBookSnapshot>,
{
    let mut prev: Option<f64> = None;
    let mut n = 0usize;
    let mut mean = 0.0;
    let mut m2 = 0.0;

    for mid in snapshots.into_iter().map(mid_price).filter(|m| *m > 0.0) {
        if let Some(p) = prev {
            // Welford update on the log return
            let r = (mid / p).ln();
            n += 1;
            let delta = r - mean;
            mean += delta / n as f64;
            m2 += delta * (r - mean);
        }
        prev = Some(mid);
    }

    if n == 0 {
        return 0.0;
    }
    (m2 / n as f64).sqrt() * annualization_factor
}

/// Volatility over the last `window` snapshots of `history`.
///
/// `None` while history is shorter than `window`; the caller substitutes
/// its last computed value.
pub fn volatility(history: &HistoryStore, window: usize, annualization_factor: f64) -> Option<f64> {
    if history.size() < window {
        return None;
    }
    Some(realized_volatility(history.window(window), annualization_factor))
}

/// Inputs to the slippage regressor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SlippageFeatures {
    pub spread: f64,
    pub imbalance: f64,
    pub volatility: f64,
    pub depth_ratio: f64,
    pub price_change: f64,
}

impl SlippageFeatures {
    pub const LEN: usize = 5;

    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.spread,
            self.imbalance,
            self.volatility,
            self.depth_ratio,
            self.price_change,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Inputs to the maker/taker classifier
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MakerTakerFeatures {
    pub price_change: f64,
    pub volume_ratio: f64,
    pub spread_change: f64,
    pub volatility: f64,
}

impl MakerTakerFeatures {
    pub const LEN: usize = 4;

    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.price_change,
            self.volume_ratio,
            self.spread_change,
            self.volatility,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Assembles feature vectors from snapshots using the configured windows
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Slippage features for `current`, with `previous` (if any) for price change
    pub fn slippage_features(
        &self,
        current: &OrderBookSnapshot,
        previous: Option<&OrderBookSnapshot>,
        history_len: usize,
        volatility: f64,
    ) -> SlippageFeatures {
        let price_change = previous
            .map(|prev| {
                price_change(
                    current,
                    prev,
                    history_len,
                    self.config.price_change_min_history,
                )
            })
            .unwrap_or(0.0);

        SlippageFeatures {
            spread: spread(current),
            imbalance: imbalance(current, self.config.imbalance_depth),
            volatility,
            depth_ratio: depth_ratio(current),
            price_change,
        }
    }

    /// Maker/taker features for the (`current`, `previous`) pair
    pub fn maker_taker_features(
        &self,
        current: &OrderBookSnapshot,
        previous: &OrderBookSnapshot,
        history_len: usize,
        volatility: f64,
    ) -> MakerTakerFeatures {
        MakerTakerFeatures {
            price_change: price_change(
                current,
                previous,
                history_len,
                self.config.price_change_min_history,
            ),
            volume_ratio: volume_ratio(current, previous),
            spread_change: spread_change(current, previous),
            volatility,
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}
