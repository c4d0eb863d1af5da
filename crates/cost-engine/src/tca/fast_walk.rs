//! Depth-walk slippage (latency-critical path)
//!
//! Sweeps book levels best-first until the target quantity is filled or the
//! levels run out:
//!
//! ```text
//! fill_i   = min(remaining, qty_i)
//! avg      = Σ(fill_i × price_i) / Σfill_i
//! buy  %   = (avg − mid) / mid × 100
//! sell %   = (mid − avg) / mid × 100
//! ```
//!
//! Nothing here allocates. Levels are `#[repr(C)]` `(price, quantity)` pairs
//! laid out contiguously, and the walk touches only the levels it consumes.

use tradecost_core::{OrderBookSnapshot, PriceLevel, Side};

use super::impact::LinearImpact;

/// Accumulated result of a depth walk
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WalkFill {
    pub filled: f64,
    pub notional: f64,
    /// Levels touched (including the partially consumed one)
    pub levels_consumed: usize,
}

impl WalkFill {
    /// Volume-weighted fill price, if anything filled
    #[inline]
    pub fn average_price(&self) -> Option<f64> {
        (self.filled > 0.0).then(|| self.notional / self.filled)
    }
}

/// Sweep `levels` for `quantity`. O(levels consumed), no allocation.
#[inline]
pub fn walk_fill(levels: &[PriceLevel], quantity: f64) -> WalkFill {
    let mut fill = WalkFill::default();
    let mut remaining = quantity;

    for level in levels {
        if remaining <= 0.0 {
            break;
        }
        let take = remaining.min(level.quantity);
        if take > 0.0 {
            fill.filled += take;
            fill.notional += take * level.price;
            remaining -= take;
        }
        fill.levels_consumed += 1;
    }
    fill
}

/// Slippage percent of sweeping `levels` for `quantity` against `mid`.
///
/// 0 when nothing fills or `mid` ≤ 0.
#[inline]
pub fn walk_slippage(levels: &[PriceLevel], quantity: f64, mid: f64, side: Side) -> f64 {
    if mid <= 0.0 {
        return 0.0;
    }
    let Some(avg) = walk_fill(levels, quantity).average_price() else {
        return 0.0;
    };
    match side {
        Side::Buy => (avg - mid) / mid * 100.0,
        Side::Sell => (mid - avg) / mid * 100.0,
    }
}

/// Annualised population std-dev of log returns over a contiguous price series.
///
/// Non-positive prices are skipped; 0 with fewer than two usable prices.
pub fn vectorized_volatility(prices: &[f64], annualization_factor: f64) -> f64 {
    let mut prev: Option<f64> = None;
    let (mut n, mut sum, mut sum_sq) = (0usize, 0.0, 0.0);

    for &p in prices.iter().filter(|p| **p > 0.0) {
        if let Some(q) = prev {
            let r = (p / q).ln();
            n += 1;
            sum += r;
            sum_sq += r * r;
        }
        prev = Some(p);
    }
    if n == 0 {
        return 0.0;
    }
    let mean = sum / n as f64;
    let var = (sum_sq / n as f64 - mean * mean).max(0.0);
    var.sqrt() * annualization_factor
}

/// Model-free cost path over a single snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct FastWalkCalculator {
    impact: LinearImpact,
}

impl FastWalkCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth-walk slippage for a `side` order of `quantity`, against the snapshot mid
    pub fn slippage(&self, snapshot: &OrderBookSnapshot, quantity: f64, side: Side) -> f64 {
        let mid = crate::features::mid_price(snapshot);
        walk_slippage(snapshot.liquidity_for(side), quantity, mid, side)
    }

    /// Linear impact over top-20 liquidity on the consumed side
    pub fn impact(&self, snapshot: &OrderBookSnapshot, quantity: f64, side: Side) -> f64 {
        let liquidity = OrderBookSnapshot::quantity_in_range(snapshot.liquidity_for(side), 0, 20);
        self.impact.impact_pct(quantity, liquidity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn levels(pairs: &[(f64, f64)]) -> Vec<PriceLevel> {
        pairs.iter().copied().map(PriceLevel::from).collect()
    }

    #[test]
    fn test_walk_partial_second_level() {
        let asks = levels(&[(100.0, 5.0), (101.0, 5.0)]);
        let fill = walk_fill(&asks, 8.0);
        assert_eq!(fill.filled, 8.0);
        assert_eq!(fill.levels_consumed, 2);
        assert_relative_eq!(fill.average_price().unwrap(), 100.375);

        let slip = walk_slippage(&asks, 8.0, 100.0, Side::Buy);
        assert_relative_eq!(slip, 0.375, epsilon = 1e-12);
        assert!(slip > 0.0);
    }

    #[test]
    fn test_walk_stops_when_filled() {
        let asks = levels(&[(100.0, 5.0), (101.0, 5.0), (102.0, 5.0)]);
        let fill = walk_fill(&asks, 5.0);
        assert_eq!(fill.levels_consumed, 1);
        assert_eq!(fill.average_price(), Some(100.0));
    }

    #[test]
    fn test_walk_exhausts_book() {
        let asks = levels(&[(100.0, 1.0), (102.0, 1.0)]);
        let fill = walk_fill(&asks, 10.0);
        assert_eq!(fill.filled, 2.0);
        assert_relative_eq!(fill.average_price().unwrap(), 101.0);
    }

    #[test]
    fn test_sell_side_sign() {
        let bids = levels(&[(99.0, 2.0), (98.0, 2.0)]);
        let slip = walk_slippage(&bids, 4.0, 100.0, Side::Sell);
        assert_relative_eq!(slip, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_nothing_filled() {
        assert_eq!(walk_slippage(&[], 5.0, 100.0, Side::Buy), 0.0);
        let empty = levels(&[(100.0, 0.0)]);
        assert_eq!(walk_slippage(&empty, 5.0, 100.0, Side::Buy), 0.0);
        let asks = levels(&[(100.0, 5.0)]);
        assert_eq!(walk_slippage(&asks, 0.0, 100.0, Side::Buy), 0.0);
        assert_eq!(walk_slippage(&asks, 1.0, 0.0, Side::Buy), 0.0);
    }

    #[test]
    fn test_vectorized_volatility() {
        assert_eq!(vectorized_volatility(&[100.0; 10], 1.0), 0.0);
        assert_eq!(vectorized_volatility(&[100.0], 1.0), 0.0);

        let prices = [100.0, 110.0, 100.0, 110.0];
        let r = 1.1f64.ln();
        let mean = r / 3.0;
        let var = ((r - mean).powi(2) * 2.0 + (-r - mean).powi(2)) / 3.0;
        assert_relative_eq!(vectorized_volatility(&prices, 2.0), var.sqrt() * 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_calculator_on_snapshot() {
        use chrono::Utc;
        let snapshot = OrderBookSnapshot::new(
            Utc::now(),
            levels(&[(99.0, 5.0), (98.0, 5.0)]),
            levels(&[(101.0, 5.0), (102.0, 5.0)]),
        );
        let calc = FastWalkCalculator::new();
        // avg 101 against mid 100
        assert_relative_eq!(calc.slippage(&snapshot, 5.0, Side::Buy), 1.0, epsilon = 1e-12);
        assert_relative_eq!(calc.impact(&snapshot, 1.0, Side::Buy), 0.11 / 10.0 * 100.0, epsilon = 1e-12);
    }
}
