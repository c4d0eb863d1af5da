//! Trade-Cost Engine
//!
//! Estimates the cost of a prospective order from a live L2 feed:
//! - **History**: bounded, chronological snapshot buffer
//! - **Features**: spread, imbalance, depth, price/volume/spread change, volatility
//! - **Learned Models**: slippage regressor and maker/taker classifier, refit on a cadence
//! - **TCA**: tiered market impact, tiered fees, allocation-free depth walk
//! - **Metrics**: query latency and feed rate
//!
//! ## Architecture
//!
//! ```text
//! Feed ──► RawSnapshot ──► ┌──────────────────────────────────────────┐
//!                          │               CostEngine                 │
//!                          │  ┌────────────────────────────────────┐  │
//!                          │  │  SnapshotValidator                 │  │
//!                          │  │  - required fields, ≥5 levels/side │  │
//!                          │  └──────────────┬─────────────────────┘  │
//!                          │                 │ OrderBookSnapshot      │
//!                          │  ┌──────────────▼─────────────────────┐  │
//!                          │  │  HistoryStore (2000, ring)         │  │
//!                          │  └──────────────┬─────────────────────┘  │
//!                          │                 │ every 50th, ≥100       │
//!                          │  ┌──────────────▼─────────────────────┐  │
//!                          │  │  TrainingSet ──► refit ──► ArcSwap │  │
//!                          │  └────────────────────────────────────┘  │
//!                          └──────────────────────────────────────────┘
//!
//! CostQuery ──► features ──► slippage + maker/taker + fee + impact ──► CostEstimate
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tradecost_engine::{CostEngine, CostQuery, EngineConfig};
//! use tradecost_core::Side;
//!
//! let engine = CostEngine::new(EngineConfig::default())?;
//! engine.ingest_json(message);
//!
//! let query = CostQuery::new(0.5, Side::Buy)
//!     .with_volatility_sensitivity(0.3)
//!     .with_fee_tier(2);
//! if let Some(estimate) = engine.compute_metrics(&query)? {
//!     println!("net cost {:.4}", estimate.net_cost);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod history;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod tca;

pub use config::{EngineConfig, load_config, load_config_from_str};
pub use engine::{CostEngine, FitOutcome, IngestOutcome, ModelSet, ModelStatus, RetrainSummary};
pub use error::{Error, FitError, Result};
pub use features::{FeatureExtractor, MakerTakerFeatures, SlippageFeatures};
pub use history::HistoryStore;
pub use metrics::{LatencySummary, MetricsAggregator};
pub use models::{FitReport, MakerTakerClassifier, MakerTakerSplit, SlippageEstimator};
pub use registry::EngineRegistry;
pub use tca::{CostEstimate, CostQuery, FastWalkCalculator, MarketImpactCalculator};
