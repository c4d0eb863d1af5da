//! Cost Engine
//!
//! Orchestrates ingestion, periodic model refits and cost queries for one
//! symbol.
//!
//! Architecture:
//! - `Mutex<EngineState>`: history, fallback caches, counters and timing.
//!   Ingest and query hold it only for bounded, allocation-light work.
//! - `ArcSwap<ModelSet>`: fitted model parameters. Queries load a snapshot
//!   and never see a model mid-refit; refits build a new set and swap it in.
//!
//! ```text
//! ingest ──► validate ──► lock: append, count, time ──► unlock
//!                                   │ every Nth accepted, history ≥ min
//!                                   ▼
//!                      build TrainingSet (under lock)
//!                                   │
//!                      fit both models (no lock held)
//!                                   │
//!                      models.rcu(newer generation wins)
//!
//! compute_metrics ──► models.load() ──► lock: features, impact, timing ──► CostEstimate
//! ```

use arc_swap::ArcSwap;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tradecost_core::{OrderBookSnapshot, RawSnapshot, RejectReason, Side, SnapshotValidator};

use crate::config::EngineConfig;
use crate::error::{FitError, Result};
use crate::features::{FeatureExtractor, mid_price, volatility};
use crate::history::HistoryStore;
use crate::metrics::{LatencySummary, MetricsAggregator};
use crate::models::{FitReport, MakerTakerClassifier, SlippageEstimator, TrainingSet};
use crate::tca::{CostEstimate, CostQuery, FastWalkCalculator, MarketImpactCalculator};

/// Fitted parameters for both learned models, swapped as one unit
#[derive(Debug, Clone, Default)]
pub struct ModelSet {
    pub slippage: SlippageEstimator,
    pub maker_taker: MakerTakerClassifier,
    /// Generation of the most recent refit that produced this set
    pub generation: u64,
}

/// Outcome of one model's refit attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    /// New parameters are in effect
    Fitted(FitReport),
    /// Previous parameters kept
    Retained(FitError),
}

impl FitOutcome {
    pub fn is_fitted(&self) -> bool {
        matches!(self, FitOutcome::Fitted(_))
    }
}

/// What a retraining cycle did
#[derive(Debug, Clone, PartialEq)]
pub struct RetrainSummary {
    pub generation: u64,
    /// History length that triggered the cycle
    pub history_len: usize,
    pub slippage: FitOutcome,
    pub maker_taker: FitOutcome,
}

/// Result of offering one snapshot to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Accepted {
        history_len: usize,
        retrained: Option<RetrainSummary>,
    },
    Rejected(RejectReason),
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted { .. })
    }
}

/// Training state of both models
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub generation: u64,
    pub slippage: Option<FitReport>,
    pub maker_taker: Option<FitReport>,
}

/// Mutable engine state guarded by one mutex
#[derive(Debug)]
struct EngineState {
    history: HistoryStore,
    /// Last full-window volatility, one slot per feature window
    slippage_volatility: VolatilityCache,
    maker_taker_volatility: VolatilityCache,
    impact: MarketImpactCalculator,
    metrics: MetricsAggregator,
    accepted: u64,
    rejected: u64,
    /// Last generation handed out to a refit
    generation: u64,
}

/// Last volatility a single window produced
#[derive(Debug, Clone, Copy, Default)]
struct VolatilityCache {
    window: usize,
    last: Option<f64>,
}

impl VolatilityCache {
    fn new(window: usize) -> Self {
        Self { window, last: None }
    }

    /// Volatility over the cached window, or its last value while history is short
    fn get(&mut self, history: &HistoryStore, annualization: f64) -> f64 {
        match volatility(history, self.window, annualization) {
            Some(v) => {
                self.last = Some(v);
                v
            }
            None => self.last.unwrap_or(0.0),
        }
    }
}

/// Trade-cost engine for one symbol.
///
/// `ingest*` and `compute_metrics` may be called concurrently from any
/// number of threads.
pub struct CostEngine {
    config: EngineConfig,
    validator: SnapshotValidator,
    extractor: FeatureExtractor,
    fast_walk: FastWalkCalculator,
    state: Mutex<EngineState>,
    models: ArcSwap<ModelSet>,
}

impl CostEngine {
    /// Create an engine; the configuration is validated first
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let models = ModelSet {
            slippage: SlippageEstimator::new(config.slippage.clone()),
            maker_taker: MakerTakerClassifier::new(config.maker_taker.clone()),
            generation: 0,
        };
        let state = EngineState {
            history: HistoryStore::new(config.history_capacity),
            slippage_volatility: VolatilityCache::new(config.features.slippage_volatility_window),
            maker_taker_volatility: VolatilityCache::new(
                config.features.maker_taker_volatility_window,
            ),
            impact: MarketImpactCalculator::new(config.impact.clone()),
            metrics: MetricsAggregator::new(&config.metrics),
            accepted: 0,
            rejected: 0,
            generation: 0,
        };
        info!(
            "cost engine created: history {}, retrain every {} (min history {})",
            config.history_capacity,
            config.training.retrain_interval,
            config.training.min_history
        );
        Ok(Self {
            validator: SnapshotValidator::new(config.min_levels),
            extractor: FeatureExtractor::new(config.features.clone()),
            fast_walk: FastWalkCalculator::new(),
            state: Mutex::new(state),
            models: ArcSwap::from_pointee(models),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Offer a decoded snapshot. Malformed input is counted and dropped.
    pub fn ingest(&self, raw: &RawSnapshot) -> IngestOutcome {
        self.accept(self.validator.validate(raw))
    }

    /// Offer a JSON-encoded snapshot
    pub fn ingest_json(&self, json: &str) -> IngestOutcome {
        self.accept(self.validator.validate_json(json))
    }

    /// Offer an already-typed snapshot, bypassing wire validation
    pub fn ingest_snapshot(&self, snapshot: OrderBookSnapshot) -> IngestOutcome {
        self.accept(Ok(snapshot))
    }

    fn accept(&self, validated: std::result::Result<OrderBookSnapshot, RejectReason>) -> IngestOutcome {
        let snapshot = match validated {
            Ok(snapshot) => snapshot,
            Err(reason) => {
                let rejected = {
                    let mut state = self.state.lock();
                    state.rejected += 1;
                    state.rejected
                };
                debug!("snapshot rejected ({} total): {}", rejected, reason);
                return IngestOutcome::Rejected(reason);
            }
        };

        let training = {
            let mut state = self.state.lock();
            state.history.append(snapshot);
            state.accepted += 1;
            state.metrics.record_arrival(Instant::now());

            let history_len = state.history.size();
            let due = state.accepted % self.config.training.retrain_interval == 0;
            if !due {
                return IngestOutcome::Accepted {
                    history_len,
                    retrained: None,
                };
            }
            if history_len < self.config.training.min_history {
                debug!(
                    "retrain skipped: history {} < {}",
                    history_len, self.config.training.min_history
                );
                return IngestOutcome::Accepted {
                    history_len,
                    retrained: None,
                };
            }

            state.generation += 1;
            let models = self.models.load();
            let set = TrainingSet::build(
                &state.history,
                &self.config,
                &models.maker_taker,
                state.generation,
            );
            (set, history_len)
        };

        let (set, history_len) = training;
        let summary = self.retrain(&set, history_len);
        IngestOutcome::Accepted {
            history_len,
            retrained: Some(summary),
        }
    }

    /// Fit both models on `set` and swap in whatever succeeded.
    ///
    /// Runs without the state lock. A slower refit never overwrites a newer generation.
    fn retrain(&self, set: &TrainingSet, history_len: usize) -> RetrainSummary {
        let generation = set.generation;
        let current = self.models.load_full();
        let training = &self.config.training;

        let slippage = current
            .slippage
            .retrained(&set.slippage, training, generation);
        let maker_taker = current
            .maker_taker
            .retrained(&set.maker_taker, training, generation);

        let summary = RetrainSummary {
            generation,
            history_len,
            slippage: Self::outcome("slippage", &slippage),
            maker_taker: Self::outcome("maker/taker", &maker_taker),
        };

        if slippage.is_ok() || maker_taker.is_ok() {
            self.models.rcu(|installed| {
                if installed.generation >= generation {
                    return Arc::clone(installed);
                }
                Arc::new(ModelSet {
                    slippage: slippage
                        .as_ref()
                        .map_or_else(|_| installed.slippage.clone(), Clone::clone),
                    maker_taker: maker_taker
                        .as_ref()
                        .map_or_else(|_| installed.maker_taker.clone(), Clone::clone),
                    generation,
                })
            });
        }

        info!(
            "retrain gen {} on {} snapshots ({} examples): slippage {}, maker/taker {}",
            generation,
            history_len,
            set.len(),
            if summary.slippage.is_fitted() { "fitted" } else { "retained" },
            if summary.maker_taker.is_fitted() { "fitted" } else { "retained" },
        );
        summary
    }

    fn outcome<M>(model: &str, result: &std::result::Result<M, FitError>) -> FitOutcome
    where
        M: ModelReport,
    {
        match result {
            Ok(fitted) => match fitted.fit_report() {
                Some(report) => FitOutcome::Fitted(report),
                None => FitOutcome::Retained(FitError::NonFinite),
            },
            Err(err) if err.is_insufficient_data() => {
                debug!("{} refit skipped: {}", model, err);
                FitOutcome::Retained(err.clone())
            }
            Err(err) => {
                warn!("{} refit failed, keeping previous parameters: {}", model, err);
                FitOutcome::Retained(err.clone())
            }
        }
    }

    /// Pre-trade cost estimate against the latest snapshot.
    ///
    /// `Ok(None)` until a snapshot with a positive mid has been accepted.
    pub fn compute_metrics(&self, query: &CostQuery) -> Result<Option<CostEstimate>> {
        query.validate()?;
        let started = Instant::now();
        let models = self.models.load();
        let features = &self.config.features;
        let annualization = features.annualization_factor();

        let mut state = self.state.lock();
        let state = &mut *state;

        let Some(latest) = state.history.latest() else {
            return Ok(None);
        };
        let mid = mid_price(latest);
        if mid <= 0.0 {
            return Ok(None);
        }
        let latest = latest.clone();
        let previous = state.history.previous().cloned();
        let history_len = state.history.size();

        let slippage_vol = state
            .slippage_volatility
            .get(&state.history, annualization);
        let slippage_features =
            self.extractor
                .slippage_features(&latest, previous.as_ref(), history_len, slippage_vol);
        let slippage_pct = models.slippage.estimate(
            &slippage_features,
            query.quantity,
            query.volatility_sensitivity,
        );

        let maker_taker_vol = state
            .maker_taker_volatility
            .get(&state.history, annualization);
        let split = match previous.as_ref() {
            Some(prev) => {
                let mt_features = self.extractor.maker_taker_features(
                    &latest,
                    prev,
                    history_len,
                    maker_taker_vol,
                );
                models.maker_taker.predict(&mt_features, history_len)
            }
            None => models.maker_taker.default_split(),
        };

        let price = query.price.unwrap_or(mid);
        let fee_amount = self
            .config
            .fees
            .fee(query.quantity, price, query.tier(), split.is_maker());

        let market_impact_pct = state.impact.calculate(
            query.quantity,
            query.side,
            &latest,
            history_len,
            slippage_vol,
            query.volatility_sensitivity,
        );

        let net_cost = CostEstimate::net_cost(
            slippage_pct,
            market_impact_pct,
            fee_amount,
            price,
            query.quantity,
        );

        let processing_time_ms = started.elapsed().as_secs_f64() * 1_000.0;
        state.metrics.record_processing(processing_time_ms);

        Ok(Some(CostEstimate {
            mid_price: mid,
            slippage_pct,
            fee_amount,
            market_impact_pct,
            net_cost,
            maker_prob: split.maker,
            taker_prob: split.taker,
            processing_time_ms,
            median_processing_time_ms: state.metrics.median_processing_ms(),
            mean_update_interval_sec: state.metrics.mean_update_interval_sec(),
            update_frequency_hz: state.metrics.update_frequency_hz(),
            order_book_depth: latest.asks.len(),
            volatility: slippage_vol,
            liquidity_estimate: latest.two_sided_quantity(0, 20),
        }))
    }

    /// Model-free slippage from walking the latest book; `None` before any data
    pub fn book_walk_slippage(&self, quantity: f64, side: Side) -> Option<f64> {
        let state = self.state.lock();
        let latest = state.history.latest()?;
        Some(self.fast_walk.slippage(latest, quantity, side))
    }

    /// Mid of the latest snapshot; `None` before any data or when mid ≤ 0
    pub fn mid_price(&self) -> Option<f64> {
        let state = self.state.lock();
        let mid = mid_price(state.history.latest()?);
        (mid > 0.0).then_some(mid)
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().history.size()
    }

    pub fn accepted_count(&self) -> u64 {
        self.state.lock().accepted
    }

    pub fn rejected_count(&self) -> u64 {
        self.state.lock().rejected
    }

    pub fn latency_summary(&self) -> LatencySummary {
        self.state.lock().metrics.latency_summary()
    }

    pub fn model_status(&self) -> ModelStatus {
        let models = self.models.load();
        ModelStatus {
            generation: models.generation,
            slippage: models.slippage.state().report().copied(),
            maker_taker: models.maker_taker.state().report().copied(),
        }
    }
}

impl std::fmt::Debug for CostEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostEngine")
            .field("history_len", &self.history_len())
            .field("models", &self.model_status())
            .finish()
    }
}

/// Access to the fit report of a freshly trained model
trait ModelReport {
    fn fit_report(&self) -> Option<FitReport>;
}

impl ModelReport for SlippageEstimator {
    fn fit_report(&self) -> Option<FitReport> {
        self.state().report().copied()
    }
}

impl ModelReport for MakerTakerClassifier {
    fn fit_report(&self) -> Option<FitReport> {
        self.state().report().copied()
    }
}
