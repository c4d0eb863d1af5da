//! Replay session
//!
//! Feeds JSON snapshots into an [`EngineRegistry`] on a blocking thread while
//! a sampler task queries every engine on a fixed interval. The feed side
//! signals the sampler through a `watch` channel once input is exhausted.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::time::Duration;
use tokio::sync::watch;
use tradecost_core::{RawSnapshot, Side};
use tradecost_engine::{
    CostEstimate, CostQuery, EngineConfig, EngineRegistry, IngestOutcome, LatencySummary,
    ModelStatus,
};

use crate::error::Result;

/// Symbol used for payloads that do not carry one
pub const DEFAULT_SYMBOL: &str = "DEFAULT";

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub engine: EngineConfig,
    pub query: CostQuery,
    /// Sampler period
    pub query_interval: Duration,
    pub default_symbol: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            query: CostQuery::new(1.0, Side::Buy),
            query_interval: Duration::from_millis(100),
            default_symbol: DEFAULT_SYMBOL.to_string(),
        }
    }
}

/// Line counters for the whole feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    /// Non-blank lines read
    pub lines: u64,
    pub accepted: u64,
    /// Lines that failed to decode or validate
    pub rejected: u64,
    /// Snapshots that triggered a retraining cycle
    pub retrains: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub accepted: u64,
    pub rejected: u64,
    pub history_len: usize,
    pub models: ModelStatus,
    pub latency: LatencySummary,
    pub final_estimate: Option<CostEstimate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub feed: FeedStats,
    /// Estimates produced by the sampler while the feed ran
    pub samples: u64,
    pub symbols: BTreeMap<String, SymbolReport>,
}

pub struct ReplaySession {
    config: ReplayConfig,
    registry: EngineRegistry,
}

impl ReplaySession {
    pub fn new(config: ReplayConfig) -> Result<Self> {
        config.query.validate()?;
        let registry = EngineRegistry::new(config.engine.clone())?;
        Ok(Self { config, registry })
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Replay every line of `reader`, then report on each symbol seen
    pub async fn run<R>(&self, reader: R) -> Result<ReplayReport>
    where
        R: BufRead + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);

        let sampler = tokio::spawn(sample(
            self.registry.clone(),
            self.config.query,
            self.config.query_interval,
            stop_rx,
        ));

        let registry = self.registry.clone();
        let default_symbol = self.config.default_symbol.clone();
        let fed = tokio::task::spawn_blocking(move || feed(&registry, &default_symbol, reader)).await;

        // The sampler must stop even when the feed failed
        let _ = stop_tx.send(true);
        let samples = sampler.await?;
        let feed = fed??;

        log::info!(
            "Replay finished: {} lines, {} accepted, {} rejected, {} retrains, {} samples",
            feed.lines,
            feed.accepted,
            feed.rejected,
            feed.retrains,
            samples
        );

        Ok(ReplayReport {
            feed,
            samples,
            symbols: self.symbol_reports()?,
        })
    }

    fn symbol_reports(&self) -> Result<BTreeMap<String, SymbolReport>> {
        let mut reports = BTreeMap::new();
        for symbol in self.registry.symbols() {
            let Some(engine) = self.registry.get(&symbol) else {
                continue;
            };
            let final_estimate = engine.compute_metrics(&self.config.query)?;
            reports.insert(
                symbol,
                SymbolReport {
                    accepted: engine.accepted_count(),
                    rejected: engine.rejected_count(),
                    history_len: engine.history_len(),
                    models: engine.model_status(),
                    latency: engine.latency_summary(),
                    final_estimate,
                },
            );
        }
        Ok(reports)
    }
}

fn feed<R: BufRead>(registry: &EngineRegistry, default_symbol: &str, reader: R) -> Result<FeedStats> {
    let mut stats = FeedStats::default();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.lines += 1;

        let raw = match RawSnapshot::from_json(line) {
            Ok(raw) => raw,
            Err(e) => {
                stats.rejected += 1;
                log::debug!("Line {}: malformed payload: {}", stats.lines, e);
                continue;
            }
        };

        match registry.ingest(default_symbol, &raw)? {
            IngestOutcome::Accepted { retrained, .. } => {
                stats.accepted += 1;
                if let Some(summary) = retrained {
                    stats.retrains += 1;
                    log::debug!(
                        "Line {}: retrained to generation {}",
                        stats.lines,
                        summary.generation
                    );
                }
            }
            IngestOutcome::Rejected(reason) => {
                stats.rejected += 1;
                log::debug!("Line {}: rejected: {}", stats.lines, reason);
            }
        }
    }

    Ok(stats)
}

async fn sample(
    registry: EngineRegistry,
    query: CostQuery,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) -> u64 {
    let mut ticker = tokio::time::interval(period);
    let mut samples = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for symbol in registry.symbols() {
                    let Some(engine) = registry.get(&symbol) else {
                        continue;
                    };
                    match engine.compute_metrics(&query) {
                        Ok(Some(estimate)) => {
                            samples += 1;
                            log::info!(
                                "[{}] mid {:.2} slip {:.4}% impact {:.4}% fee {:.4} net {:.4} maker {:.2} ({:.3} ms)",
                                symbol,
                                estimate.mid_price,
                                estimate.slippage_pct,
                                estimate.market_impact_pct,
                                estimate.fee_amount,
                                estimate.net_cost,
                                estimate.maker_prob,
                                estimate.processing_time_ms
                            );
                        }
                        Ok(None) => log::debug!("[{}] no data yet", symbol),
                        Err(e) => log::warn!("[{}] query failed: {}", symbol, e),
                    }
                }
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }

    samples
}
