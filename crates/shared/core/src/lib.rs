//! Trade-Cost Core Domain
//!
//! Pure domain types shared by the trade-cost analytics engine.
//! This crate contains no async, no I/O, and is 100% unit testable.
//!
//! - [`messages`]: loosely-typed wire payloads from the transport layer
//! - [`validation`]: the only path from a wire payload to a typed snapshot
//! - [`entities`]: validated snapshots, levels, sides and the fee table

pub mod entities;
pub mod messages;
pub mod validation;

// Re-export commonly used types at crate root
pub use entities::{FeeSchedule, FeeTier, OrderBookSnapshot, PriceLevel, Side};
pub use messages::{RawLevel, RawSnapshot};
pub use validation::{MIN_LEVELS, RejectReason, SnapshotValidator};
