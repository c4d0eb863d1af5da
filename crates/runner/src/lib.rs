//! Trade-Cost Replay Runner
//!
//! Drives the cost engine from a recorded feed:
//!
//! - **Feed**: newline-delimited JSON snapshots, routed per symbol
//! - **Sampler**: periodic cost queries against every live engine
//! - **Report**: per-symbol feed counters, model status and final estimate
//!
//! ## Architecture
//!
//! ```text
//!  JSON lines ──► spawn_blocking(feed) ──► EngineRegistry ──► CostEngine (per symbol)
//!                        │                                          ▲
//!                        │ stop (watch)                             │ compute_metrics
//!                        ▼                                          │
//!                 sampler task ── interval tick ────────────────────┘
//! ```

pub mod error;
pub mod replay;

pub use error::{Result, RunnerError};
pub use replay::{FeedStats, ReplayConfig, ReplayReport, ReplaySession, SymbolReport};
