//! Transaction Cost Analysis (TCA)
//!
//! Pre-trade cost components that do not learn from history.
//!
//! # Components
//!
//! - [`impact`]: tiered Almgren-Chriss style and linear impact models
//! - [`fast_walk`]: allocation-free depth walk for the latency path
//! - [`estimate`]: query parameters and the composed cost estimate
//!
//! Fees come from [`tradecost_core::FeeSchedule`].

pub mod estimate;
pub mod fast_walk;
pub mod impact;

pub use estimate::{CostEstimate, CostQuery};
pub use fast_walk::{FastWalkCalculator, WalkFill, vectorized_volatility, walk_fill, walk_slippage};
pub use impact::{
    AlmgrenChrissImpact, ImpactModel, LinearImpact, LiquidityProfile, MarketImpact,
    MarketImpactCalculator,
};
