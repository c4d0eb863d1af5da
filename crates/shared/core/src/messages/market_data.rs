//! Market data wire messages
//!
//! Loosely-typed ingestion payloads as delivered by the transport layer.
//! Nothing here is trusted: [`SnapshotValidator`] turns a [`RawSnapshot`]
//! into a typed [`OrderBookSnapshot`] or a rejection.
//!
//! [`SnapshotValidator`]: crate::SnapshotValidator
//! [`OrderBookSnapshot`]: crate::OrderBookSnapshot

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One wire level, normally `[priceString, quantityString]`
pub type RawLevel = Vec<Value>;

/// Decoded L2 order book message
///
/// ```json
/// {
///   "timestamp": "2025-05-04T10:39:13Z",
///   "exchange": "OKX",
///   "symbol": "BTC-USDT-SWAP",
///   "asks": [["95445.5", "9.06"], ["95448", "2.05"]],
///   "bids": [["95445.4", "1104.23"], ["95445.3", "0.02"]]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    /// Ask levels, best-first
    #[serde(default)]
    pub asks: Option<Vec<RawLevel>>,
    /// Bid levels, best-first
    #[serde(default)]
    pub bids: Option<Vec<RawLevel>>,
    /// RFC 3339 string or epoch milliseconds
    #[serde(default)]
    pub timestamp: Option<Value>,
    /// Source exchange, if the feed carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    /// Instrument symbol, if the feed carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl RawSnapshot {
    /// Decode a raw snapshot from a JSON message
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build a payload from string levels (mainly for feeds and tests)
    pub fn from_levels(
        timestamp: impl Into<Value>,
        bids: &[(&str, &str)],
        asks: &[(&str, &str)],
    ) -> Self {
        let to_raw = |levels: &[(&str, &str)]| {
            levels
                .iter()
                .map(|(p, q)| vec![Value::from(*p), Value::from(*q)])
                .collect()
        };
        Self {
            asks: Some(to_raw(asks)),
            bids: Some(to_raw(bids)),
            timestamp: Some(timestamp.into()),
            exchange: None,
            symbol: None,
        }
    }

    /// Builder: set symbol
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_feed_message() {
        let json = r#"{
            "timestamp": "2025-05-04T10:39:13Z",
            "exchange": "OKX",
            "symbol": "BTC-USDT-SWAP",
            "asks": [["95445.5", "9.06"], ["95448", "2.05"]],
            "bids": [["95445.4", "1104.23"], ["95445.3", "0.02"]]
        }"#;

        let raw = RawSnapshot::from_json(json).unwrap();
        assert_eq!(raw.symbol.as_deref(), Some("BTC-USDT-SWAP"));
        assert_eq!(raw.asks.as_ref().map(Vec::len), Some(2));
        assert_eq!(raw.bids.as_ref().unwrap()[0][0], Value::from("95445.4"));
    }

    #[test]
    fn test_missing_fields_decode_as_none() {
        let raw = RawSnapshot::from_json(r#"{"asks": []}"#).unwrap();
        assert!(raw.bids.is_none());
        assert!(raw.timestamp.is_none());
    }

    #[test]
    fn test_wrong_shape_fails_decode() {
        assert!(RawSnapshot::from_json(r#"{"asks": "nope"}"#).is_err());
    }
}
