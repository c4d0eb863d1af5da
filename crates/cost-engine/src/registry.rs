//! Per-symbol engine registry
//!
//! One [`CostEngine`] per symbol, created on first use. Different symbols
//! never contend on the same lock.

use dashmap::DashMap;
use std::sync::Arc;
use tradecost_core::RawSnapshot;

use crate::config::EngineConfig;
use crate::engine::{CostEngine, IngestOutcome};
use crate::error::Result;

#[derive(Clone)]
pub struct EngineRegistry {
    config: EngineConfig,
    engines: Arc<DashMap<String, Arc<CostEngine>>>,
}

impl EngineRegistry {
    /// Registry whose engines all share `config`
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            engines: Arc::new(DashMap::new()),
        })
    }

    /// Engine for `symbol`, creating it if needed
    pub fn engine(&self, symbol: &str) -> Result<Arc<CostEngine>> {
        // Fast path: already registered
        if let Some(entry) = self.engines.get(symbol) {
            return Ok(Arc::clone(&entry));
        }

        let engine = Arc::new(CostEngine::new(self.config.clone())?);
        Ok(self
            .engines
            .entry(symbol.to_string())
            .or_insert(engine)
            .clone())
    }

    /// Engine for `symbol` if one exists
    pub fn get(&self, symbol: &str) -> Option<Arc<CostEngine>> {
        self.engines.get(symbol).map(|e| Arc::clone(&e))
    }

    /// Route a snapshot to its symbol's engine.
    ///
    /// Uses the payload's `symbol` field when present, else `default_symbol`.
    pub fn ingest(&self, default_symbol: &str, raw: &RawSnapshot) -> Result<IngestOutcome> {
        let symbol = raw.symbol.as_deref().unwrap_or(default_symbol);
        Ok(self.engine(symbol)?.ingest(raw))
    }

    /// Registered symbols, sorted
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.engines.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("symbols", &self.symbols())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(symbol: Option<&str>) -> RawSnapshot {
        let bids = [("99.0", "1"), ("98.9", "1"), ("98.8", "1"), ("98.7", "1"), ("98.6", "1")];
        let asks = [("101.0", "1"), ("101.1", "1"), ("101.2", "1"), ("101.3", "1"), ("101.4", "1")];
        let raw = RawSnapshot::from_levels("2024-01-01T00:00:00Z", &bids, &asks);
        match symbol {
            Some(s) => raw.with_symbol(s),
            None => raw,
        }
    }

    #[test]
    fn test_same_symbol_same_engine() {
        let registry = EngineRegistry::new(EngineConfig::default()).unwrap();
        let a = registry.engine("BTC-USDT").unwrap();
        let b = registry.engine("BTC-USDT").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_routes_by_payload_symbol() {
        let registry = EngineRegistry::new(EngineConfig::default()).unwrap();
        assert!(registry.ingest("DEFAULT", &raw(Some("ETH-USDT"))).unwrap().is_accepted());
        assert!(registry.ingest("DEFAULT", &raw(None)).unwrap().is_accepted());

        assert_eq!(registry.symbols(), vec!["DEFAULT".to_string(), "ETH-USDT".to_string()]);
        assert_eq!(registry.get("ETH-USDT").map(|e| e.history_len()), Some(1));
        assert!(registry.get("SOL-USDT").is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            history_capacity: 0,
            ..Default::default()
        };
        assert!(EngineRegistry::new(config).is_err());
    }
}
