use serde::{Deserialize, Serialize};

/// Fee tier based on trading volume or VIP level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FeeTier {
    /// Default tier for new accounts (VIP0)
    #[default]
    Tier1,
    /// VIP1
    Tier2,
    /// VIP2
    Tier3,
}

impl FeeTier {
    /// Map a numeric tier (1, 2, 3) to a `FeeTier`.
    ///
    /// Unknown tiers fall back to `Tier1`.
    pub fn from_level(level: u8) -> Self {
        match level {
            2 => FeeTier::Tier2,
            3 => FeeTier::Tier3,
            _ => FeeTier::Tier1,
        }
    }

    /// Numeric level of the tier
    pub fn level(&self) -> u8 {
        match self {
            FeeTier::Tier1 => 1,
            FeeTier::Tier2 => 2,
            FeeTier::Tier3 => 3,
        }
    }

    fn index(&self) -> usize {
        self.level() as usize - 1
    }
}

/// Tiered fee table: {maker, taker} × {tier 1, 2, 3} → rate
///
/// Rates are fractions of notional (0.001 = 0.10%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Maker rates for tiers 1..=3 (adds liquidity)
    pub maker_rates: [f64; 3],
    /// Taker rates for tiers 1..=3 (removes liquidity)
    pub taker_rates: [f64; 3],
}

impl FeeSchedule {
    /// Create a new fee schedule
    pub fn new(maker_rates: [f64; 3], taker_rates: [f64; 3]) -> Self {
        Self {
            maker_rates,
            taker_rates,
        }
    }

    /// Fee rate for a tier and liquidity role
    pub fn rate(&self, tier: FeeTier, is_maker: bool) -> f64 {
        if is_maker {
            self.maker_rates[tier.index()]
        } else {
            self.taker_rates[tier.index()]
        }
    }

    /// Calculate fee for a trade: quantity × price × rate
    pub fn fee(&self, quantity: f64, price: f64, tier: FeeTier, is_maker: bool) -> f64 {
        quantity * price * self.rate(tier, is_maker)
    }

    /// Calculate fee from a numeric tier (unknown tiers use tier 1)
    pub fn fee_for_level(&self, quantity: f64, price: f64, tier: u8, is_maker: bool) -> f64 {
        self.fee(quantity, price, FeeTier::from_level(tier), is_maker)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            maker_rates: [0.0008, 0.0006, 0.0004],
            taker_rates: [0.0010, 0.0008, 0.0005],
        }
    }
}
