//! Market Impact Models
//!
//! Non-learned impact estimates from visible depth and realised volatility.
//!
//! # Models
//!
//! ## Almgren-Chriss style, tiered liquidity
//!
//! ```text
//! L          = 0.6·immediate + 0.3·near + 0.1·deep
//! r          = Q / L
//! η          = 0.05 + 0.15·σ
//! γ          = 0.01 + 0.04·σ
//! temporary  = η × r^0.7
//! permanent  = γ × r^0.5
//! impact %   = (temporary + permanent) × (0.8 + 0.4·sens) × 100
//! ```
//!
//! ## Linear
//!
//! Latency-path approximation with fixed coefficients:
//! ```text
//! impact % = (0.1 + 0.01) × Q / L × 100
//! ```

use log::trace;
use serde::{Deserialize, Serialize};
use tradecost_core::{OrderBookSnapshot, PriceLevel, Side};

use crate::config::ImpactConfig;

/// Visible liquidity split by distance from the touch
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityProfile {
    /// Σqty levels 0..5
    pub immediate: f64,
    /// Σqty levels 5..10
    pub near: f64,
    /// Σqty levels 10..20
    pub deep: f64,
}

impl LiquidityProfile {
    pub fn from_levels(levels: &[PriceLevel]) -> Self {
        Self {
            immediate: OrderBookSnapshot::quantity_in_range(levels, 0, 5),
            near: OrderBookSnapshot::quantity_in_range(levels, 5, 10),
            deep: OrderBookSnapshot::quantity_in_range(levels, 10, 20),
        }
    }

    /// Liquidity a taker on `side` would consume
    pub fn for_side(snapshot: &OrderBookSnapshot, side: Side) -> Self {
        Self::from_levels(snapshot.liquidity_for(side))
    }

    pub fn total(&self) -> f64 {
        self.immediate + self.near + self.deep
    }

    pub fn weighted(&self, weights: [f64; 3]) -> f64 {
        weights[0] * self.immediate + weights[1] * self.near + weights[2] * self.deep
    }
}

/// Result of an impact calculation, in percent of price
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketImpact {
    pub temporary_pct: f64,
    pub permanent_pct: f64,
    pub total_pct: f64,
}

impl MarketImpact {
    pub fn from_pct(temporary: f64, permanent: f64) -> Self {
        Self {
            temporary_pct: temporary,
            permanent_pct: permanent,
            total_pct: temporary + permanent,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// Trait for market impact models
pub trait ImpactModel: Send + Sync {
    /// Impact of executing `quantity` against `liquidity`.
    ///
    /// `None` when the liquidity cannot support an estimate.
    fn calculate_impact(
        &self,
        quantity: f64,
        liquidity: &LiquidityProfile,
        volatility: f64,
        volatility_sensitivity: f64,
    ) -> Option<MarketImpact>;

    /// Model name for logging/display
    fn name(&self) -> &'static str;
}

// ============================================================================
// Almgren-Chriss style tiered model
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AlmgrenChrissImpact {
    config: ImpactConfig,
}

impl AlmgrenChrissImpact {
    pub fn new(config: ImpactConfig) -> Self {
        Self { config }
    }
}

impl ImpactModel for AlmgrenChrissImpact {
    fn calculate_impact(
        &self,
        quantity: f64,
        liquidity: &LiquidityProfile,
        volatility: f64,
        volatility_sensitivity: f64,
    ) -> Option<MarketImpact> {
        let weighted = liquidity.weighted(self.config.tier_weights);
        if liquidity.total() <= 0.0 || weighted <= 0.0 {
            return None;
        }

        let c = &self.config;
        let eta = c.eta_base + c.eta_volatility * volatility;
        let gamma = c.gamma_base + c.gamma_volatility * volatility;
        let size_ratio = quantity / weighted;

        let scale = (c.sensitivity_base + c.sensitivity_slope * volatility_sensitivity) * 100.0;
        let temporary = eta * size_ratio.powf(c.temporary_exponent) * scale;
        let permanent = gamma * size_ratio.powf(c.permanent_exponent) * scale;

        let impact = MarketImpact::from_pct(temporary, permanent);
        impact.total_pct.is_finite().then_some(impact)
    }

    fn name(&self) -> &'static str {
        "AlmgrenChriss"
    }
}

// ============================================================================
// Linear model
// ============================================================================

/// Fixed-coefficient linear impact over total visible liquidity
#[derive(Debug, Clone, Copy)]
pub struct LinearImpact {
    pub temporary_coefficient: f64,
    pub permanent_coefficient: f64,
}

impl Default for LinearImpact {
    fn default() -> Self {
        Self {
            temporary_coefficient: 0.1,
            permanent_coefficient: 0.01,
        }
    }
}

impl LinearImpact {
    /// Impact percent for `quantity` against `liquidity` units; 0 when liquidity ≤ 0
    #[inline]
    pub fn impact_pct(&self, quantity: f64, liquidity: f64) -> f64 {
        if liquidity <= 0.0 {
            return 0.0;
        }
        let ratio = quantity / liquidity;
        (self.temporary_coefficient + self.permanent_coefficient) * ratio * 100.0
    }
}

impl ImpactModel for LinearImpact {
    fn calculate_impact(
        &self,
        quantity: f64,
        liquidity: &LiquidityProfile,
        _volatility: f64,
        _volatility_sensitivity: f64,
    ) -> Option<MarketImpact> {
        let total = liquidity.total();
        if total <= 0.0 {
            return None;
        }
        let ratio = quantity / total * 100.0;
        Some(MarketImpact::from_pct(
            self.temporary_coefficient * ratio,
            self.permanent_coefficient * ratio,
        ))
    }

    fn name(&self) -> &'static str {
        "Linear"
    }
}

// ============================================================================
// Calculator with stale-value fallback
// ============================================================================

/// Impact calculator that remembers its last answer.
///
/// While history is short or the book side is empty, the last computed
/// impact (or 0) is returned instead of a fresh estimate.
pub struct MarketImpactCalculator {
    model: Box<dyn ImpactModel>,
    min_history: usize,
    last_impact: Option<f64>,
}

impl MarketImpactCalculator {
    pub fn new(config: ImpactConfig) -> Self {
        let min_history = config.min_history;
        Self::with_model(Box::new(AlmgrenChrissImpact::new(config)), min_history)
    }

    pub fn with_model(model: Box<dyn ImpactModel>, min_history: usize) -> Self {
        Self {
            model,
            min_history,
            last_impact: None,
        }
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    pub fn last_impact(&self) -> Option<f64> {
        self.last_impact
    }

    /// Impact in percent for a `side` order of `quantity` against `snapshot`
    pub fn calculate(
        &mut self,
        quantity: f64,
        side: Side,
        snapshot: &OrderBookSnapshot,
        history_len: usize,
        volatility: f64,
        volatility_sensitivity: f64,
    ) -> f64 {
        let fallback = self.last_impact.unwrap_or(0.0);
        if history_len < self.min_history {
            return fallback;
        }

        let liquidity = LiquidityProfile::for_side(snapshot, side);
        match self
            .model
            .calculate_impact(quantity, &liquidity, volatility, volatility_sensitivity)
        {
            Some(impact) => {
                self.last_impact = Some(impact.total_pct);
                impact.total_pct
            }
            None => {
                trace!(
                    "{} impact unavailable (liquidity {:.4}), using last value {:.6}",
                    self.model.name(),
                    liquidity.total(),
                    fallback
                );
                fallback
            }
        }
    }
}

impl std::fmt::Debug for MarketImpactCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketImpactCalculator")
            .field("model", &self.model.name())
            .field("min_history", &self.min_history)
            .field("last_impact", &self.last_impact)
            .finish()
    }
}
