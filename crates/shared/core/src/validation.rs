//! Snapshot validation
//!
//! Turns untrusted [`RawSnapshot`] payloads into typed [`OrderBookSnapshot`]s.
//! Malformed payloads are rejected with a [`RejectReason`]; the caller decides
//! whether to surface it (the cost engine only counts it).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

use crate::entities::{OrderBookSnapshot, PriceLevel, Side};
use crate::messages::{RawLevel, RawSnapshot};

/// Minimum levels per side for a snapshot to be accepted
pub const MIN_LEVELS: usize = 5;

/// Why a raw snapshot was dropped
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RejectReason {
    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Too few {side} levels: found {found}, required {required}")]
    TooFewLevels {
        side: Side,
        found: usize,
        required: usize,
    },

    #[error("Unparseable {side} level at index {index}")]
    UnparseableLevel { side: Side, index: usize },

    #[error("Non-positive {side} price at index {index}")]
    NonPositivePrice { side: Side, index: usize },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Validates raw snapshots against structural and numeric rules
#[derive(Debug, Clone)]
pub struct SnapshotValidator {
    min_levels: usize,
}

impl SnapshotValidator {
    /// Create a validator requiring `min_levels` per side
    pub fn new(min_levels: usize) -> Self {
        Self { min_levels }
    }

    /// Minimum levels required per side
    pub fn min_levels(&self) -> usize {
        self.min_levels
    }

    /// Validate a decoded payload
    pub fn validate(&self, raw: &RawSnapshot) -> Result<OrderBookSnapshot, RejectReason> {
        let asks = raw.asks.as_ref().ok_or(RejectReason::MissingField("asks"))?;
        let bids = raw.bids.as_ref().ok_or(RejectReason::MissingField("bids"))?;
        let timestamp = raw
            .timestamp
            .as_ref()
            .ok_or(RejectReason::MissingField("timestamp"))?;

        self.check_depth(Side::Buy, bids.len())?;
        self.check_depth(Side::Sell, asks.len())?;

        let bids = parse_levels(Side::Buy, bids)?;
        let asks = parse_levels(Side::Sell, asks)?;
        let timestamp = parse_timestamp(timestamp)?;

        Ok(OrderBookSnapshot::new(timestamp, bids, asks))
    }

    /// Decode and validate a JSON message in one step
    pub fn validate_json(&self, json: &str) -> Result<OrderBookSnapshot, RejectReason> {
        let raw = RawSnapshot::from_json(json).map_err(|e| RejectReason::Malformed(e.to_string()))?;
        self.validate(&raw)
    }

    fn check_depth(&self, side: Side, found: usize) -> Result<(), RejectReason> {
        if found < self.min_levels {
            return Err(RejectReason::TooFewLevels {
                side,
                found,
                required: self.min_levels,
            });
        }
        Ok(())
    }
}

impl Default for SnapshotValidator {
    fn default() -> Self {
        Self::new(MIN_LEVELS)
    }
}

/// Parse one side's levels; `side` labels bids as Buy and asks as Sell
fn parse_levels(side: Side, raw: &[RawLevel]) -> Result<Vec<PriceLevel>, RejectReason> {
    raw.iter()
        .enumerate()
        .map(|(index, level)| {
            let (price, quantity) = match level.as_slice() {
                [p, q, ..] => (parse_number(p), parse_number(q)),
                _ => (None, None),
            };
            let (Some(price), Some(quantity)) = (price, quantity) else {
                return Err(RejectReason::UnparseableLevel { side, index });
            };
            if price <= 0.0 {
                return Err(RejectReason::NonPositivePrice { side, index });
            }
            if quantity < 0.0 {
                return Err(RejectReason::UnparseableLevel { side, index });
            }
            Ok(PriceLevel::new(price, quantity))
        })
        .collect()
}

/// Parse a wire number (decimal string or JSON number) into a finite f64
fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()?
                .to_f64()?
        }
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, RejectReason> {
    let invalid = || RejectReason::InvalidTimestamp(value.to_string());
    match value {
        Value::String(s) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Ok(ts.with_timezone(&Utc));
            }
            let millis: i64 = s.trim().parse().map_err(|_| invalid())?;
            DateTime::from_timestamp_millis(millis).ok_or_else(invalid)
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}
