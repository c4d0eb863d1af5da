//! Cost query and estimate types

use serde::{Deserialize, Serialize};
use tradecost_core::{FeeTier, Side};

use crate::error::{Error, Result};

/// Parameters of a pre-trade cost query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostQuery {
    /// Order size in base units; must be positive
    pub quantity: f64,
    pub side: Side,
    /// Scales slippage and impact for volatility; expected in [0, 1]
    pub volatility_sensitivity: f64,
    /// Account fee tier (1-3; anything else is billed as tier 1)
    pub fee_tier: u8,
    /// Price used for fees instead of the current mid
    pub price: Option<f64>,
}

impl CostQuery {
    pub fn new(quantity: f64, side: Side) -> Self {
        Self {
            quantity,
            side,
            volatility_sensitivity: 0.5,
            fee_tier: FeeTier::default().level(),
            price: None,
        }
    }

    /// Builder: set volatility sensitivity
    pub fn with_volatility_sensitivity(mut self, sensitivity: f64) -> Self {
        self.volatility_sensitivity = sensitivity;
        self
    }

    /// Builder: set fee tier
    pub fn with_fee_tier(mut self, tier: u8) -> Self {
        self.fee_tier = tier;
        self
    }

    /// Builder: set fee price override
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn tier(&self) -> FeeTier {
        FeeTier::from_level(self.fee_tier)
    }

    /// Reject quantities and prices that cannot produce a meaningful estimate
    pub fn validate(&self) -> Result<()> {
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(Error::InvalidQuery(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        if !self.volatility_sensitivity.is_finite() {
            return Err(Error::InvalidQuery(
                "volatility_sensitivity must be finite".to_string(),
            ));
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price <= 0.0 {
                return Err(Error::InvalidQuery(format!(
                    "price override must be positive, got {}",
                    price
                )));
            }
        }
        Ok(())
    }
}

/// Pre-trade cost estimate for one query.
///
/// Percent fields are in percentage points (0.05 = 0.05%). Money fields are
/// in quote currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub mid_price: f64,
    pub slippage_pct: f64,
    pub fee_amount: f64,
    pub market_impact_pct: f64,
    /// slippage + fee + impact, in quote currency
    pub net_cost: f64,
    pub maker_prob: f64,
    pub taker_prob: f64,
    /// Wall-clock time of this query
    pub processing_time_ms: f64,
    /// Median over recent queries, this one included
    pub median_processing_time_ms: f64,
    pub mean_update_interval_sec: f64,
    pub update_frequency_hz: f64,
    /// Ask levels in the current snapshot
    pub order_book_depth: usize,
    /// Annualised volatility used by this estimate
    pub volatility: f64,
    /// Top-20 quantity, both sides
    pub liquidity_estimate: f64,
}

impl CostEstimate {
    /// Cost of the order in quote currency from its percentage and fee components
    pub fn net_cost(
        slippage_pct: f64,
        market_impact_pct: f64,
        fee_amount: f64,
        price: f64,
        quantity: f64,
    ) -> f64 {
        let notional = price * quantity;
        slippage_pct / 100.0 * notional + fee_amount + market_impact_pct / 100.0 * notional
    }

    /// Net cost in basis points of notional at `price`
    pub fn net_cost_bps(&self, price: f64, quantity: f64) -> f64 {
        let notional = price * quantity;
        if notional <= 0.0 {
            return 0.0;
        }
        self.net_cost / notional * 10_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_query_defaults_and_builders() {
        let q = CostQuery::new(2.0, Side::Sell)
            .with_volatility_sensitivity(0.8)
            .with_fee_tier(3)
            .with_price(50_000.0);
        assert_eq!(q.tier(), FeeTier::Tier3);
        assert_eq!(q.price, Some(50_000.0));
        assert!(q.validate().is_ok());

        let d = CostQuery::new(1.0, Side::Buy);
        assert_eq!(d.fee_tier, 1);
        assert_eq!(d.volatility_sensitivity, 0.5);
    }

    #[test]
    fn test_unknown_tier_is_tier_one() {
        assert_eq!(CostQuery::new(1.0, Side::Buy).with_fee_tier(9).tier(), FeeTier::Tier1);
    }

    #[test]
    fn test_invalid_queries() {
        for q in [
            CostQuery::new(0.0, Side::Buy),
            CostQuery::new(-1.0, Side::Buy),
            CostQuery::new(f64::NAN, Side::Buy),
            CostQuery::new(1.0, Side::Buy).with_price(0.0),
            CostQuery::new(1.0, Side::Buy).with_volatility_sensitivity(f64::INFINITY),
        ] {
            assert!(matches!(q.validate(), Err(Error::InvalidQuery(_))));
        }
    }

    #[test]
    fn test_net_cost() {
        // 0.1% slippage + 0.2% impact on 10 × 100 notional, plus 1.0 fee
        assert_relative_eq!(CostEstimate::net_cost(0.1, 0.2, 1.0, 100.0, 10.0), 4.0, epsilon = 1e-12);
    }
}
