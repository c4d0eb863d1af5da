//! Cost Engine Integration Test
//!
//! Drives the engine through its public surface only:
//! 1. Wire payloads are validated, rejected ones never reach history
//! 2. History stays bounded and chronological
//! 3. Retraining fires on the configured cadence and never regresses models
//! 4. Queries answer from the first accepted snapshot on, concurrently with ingest

use approx::assert_relative_eq;
use std::sync::Arc;
use std::thread;
use tradecost_core::{RawSnapshot, Side};
use tradecost_engine::{
    CostEngine, CostQuery, EngineConfig, FitOutcome, IngestOutcome,
    config::TrainingConfig,
    features::{self, EPSILON},
    history::HistoryStore,
    tca::walk_slippage,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Symmetric 20-level book around `mid`, serialised as the feed sends it
fn payload(seq: usize, mid: f64) -> String {
    let side = |sign: f64| -> Vec<Vec<String>> {
        (0..20)
            .map(|i| {
                vec![
                    format!("{:.2}", mid + sign * (0.05 + i as f64 * 0.1)),
                    format!("{:.3}", 1.0 + ((seq + i) % 7) as f64 * 0.5),
                ]
            })
            .collect()
    };
    serde_json::json!({
        "timestamp": 1_700_000_000_000u64 + seq as u64 * 100,
        "exchange": "OKX",
        "symbol": "BTC-USDT-SWAP",
        "asks": side(1.0),
        "bids": side(-1.0),
    })
    .to_string()
}

/// Deterministic wandering mid with both up- and down-ticks
fn mid_at(seq: usize) -> f64 {
    let wave = ((seq * 37) % 23) as f64 / 23.0 - 0.5;
    let jump = if seq % 9 == 0 { -1.5 } else { 0.0 };
    100.0 + wave * 2.0 + jump
}

fn feed(engine: &CostEngine, n: usize) -> Vec<IngestOutcome> {
    (0..n).map(|i| engine.ingest_json(&payload(i, mid_at(i)))).collect()
}

#[test]
fn test_absent_until_first_snapshot() {
    init_logger();
    let engine = CostEngine::new(EngineConfig::default()).unwrap();
    let query = CostQuery::new(1.0, Side::Buy);

    assert!(engine.compute_metrics(&query).unwrap().is_none());

    // A rejected payload does not make data available
    engine.ingest_json(r#"{"asks": [], "bids": [], "timestamp": 1}"#);
    assert!(engine.compute_metrics(&query).unwrap().is_none());

    assert!(engine.ingest_json(&payload(0, 100.0)).is_accepted());
    let estimate = engine.compute_metrics(&query).unwrap().unwrap();
    assert_relative_eq!(estimate.mid_price, 100.0, epsilon = 1e-9);
    assert_eq!(estimate.maker_prob, 0.7);
    assert_eq!(estimate.taker_prob, 0.3);
}

#[test]
fn test_shallow_snapshots_leave_history_unchanged() {
    let engine = CostEngine::new(EngineConfig::default()).unwrap();
    feed(&engine, 3);

    let four_levels = RawSnapshot::from_levels(
        "2024-01-01T00:00:00Z",
        &[("99", "1"), ("98", "1"), ("97", "1"), ("96", "1")],
        &[("101", "1"), ("102", "1"), ("103", "1"), ("104", "1"), ("105", "1")],
    );
    let outcome = engine.ingest(&four_levels);

    assert!(!outcome.is_accepted());
    assert_eq!(engine.history_len(), 3);
    assert_eq!(engine.rejected_count(), 1);
    assert_eq!(engine.accepted_count(), 3);
}

#[test]
fn test_garbage_levels_rejected() {
    let engine = CostEngine::new(EngineConfig::default()).unwrap();
    let bad = RawSnapshot::from_levels(
        "2024-01-01T00:00:00Z",
        &[("99", "1"), ("98", "1"), ("97", "1"), ("96", "1"), ("95", "1")],
        &[("abc", "1"), ("102", "1"), ("103", "1"), ("104", "1"), ("105", "1")],
    );
    assert!(!engine.ingest(&bad).is_accepted());

    let missing_ts = r#"{"asks": [["1","1"]], "bids": [["1","1"]]}"#;
    assert!(!engine.ingest_json(missing_ts).is_accepted());
    assert_eq!(engine.history_len(), 0);
    assert_eq!(engine.rejected_count(), 2);
}

#[test]
fn test_history_bounded_at_capacity() {
    let engine = CostEngine::new(EngineConfig::default()).unwrap();
    let outcomes = feed(&engine, 2001);
    assert!(outcomes.iter().all(IngestOutcome::is_accepted));
    assert_eq!(engine.history_len(), 2000);
    assert_eq!(engine.accepted_count(), 2001);
}

#[test]
fn test_retrain_only_at_cadence() {
    init_logger();
    let engine = CostEngine::new(EngineConfig::default()).unwrap();
    let outcomes = feed(&engine, 260);

    let retrained_at: Vec<usize> = outcomes
        .iter()
        .filter_map(|o| match o {
            IngestOutcome::Accepted {
                history_len,
                retrained: Some(_),
            } => Some(*history_len),
            _ => None,
        })
        .collect();
    assert_eq!(retrained_at, vec![100, 150, 200, 250]);

    // Both models fit on this feed: it has up- and down-ticks
    let status = engine.model_status();
    assert_eq!(status.generation, 4);
    let slippage = status.slippage.unwrap();
    assert_eq!(slippage.generation, 4);
    assert_eq!(slippage.samples, 248);
    assert!(status.maker_taker.is_some());
}

#[test]
fn test_small_training_set_keeps_prior_parameters() {
    // A cadence that fires before 20 usable pairs exist never fits
    let config = EngineConfig {
        training: TrainingConfig {
            retrain_interval: 10,
            min_history: 10,
            ..Default::default()
        },
        ..Default::default()
    };
    let engine = CostEngine::new(config).unwrap();
    let outcomes = feed(&engine, 20);

    let summaries: Vec<_> = outcomes
        .into_iter()
        .filter_map(|o| match o {
            IngestOutcome::Accepted {
                retrained: Some(summary),
                ..
            } => Some(summary),
            _ => None,
        })
        .collect();
    assert_eq!(summaries.len(), 2);
    for summary in &summaries {
        assert!(matches!(summary.slippage, FitOutcome::Retained(_)));
    }
    assert!(engine.model_status().slippage.is_none());
}

#[test]
fn test_compute_metrics_idempotent() {
    let engine = CostEngine::new(EngineConfig::default()).unwrap();
    feed(&engine, 160);

    let query = CostQuery::new(3.0, Side::Sell)
        .with_volatility_sensitivity(0.7)
        .with_fee_tier(2);
    let a = engine.compute_metrics(&query).unwrap().unwrap();
    let b = engine.compute_metrics(&query).unwrap().unwrap();

    assert_eq!(a.slippage_pct, b.slippage_pct);
    assert_eq!(a.market_impact_pct, b.market_impact_pct);
    assert_eq!(a.fee_amount, b.fee_amount);
    assert_eq!(a.maker_prob, b.maker_prob);
    assert_eq!(a.volatility, b.volatility);
    assert_eq!(a.net_cost, b.net_cost);
}

#[test]
fn test_compute_metrics_idempotent_before_volatility_window_fills() {
    // Enough history for impact and the 20-tick window, not the 30-tick one
    let engine = CostEngine::new(EngineConfig::default()).unwrap();
    feed(&engine, 25);

    let query = CostQuery::new(3.0, Side::Buy);
    let a = engine.compute_metrics(&query).unwrap().unwrap();
    let b = engine.compute_metrics(&query).unwrap().unwrap();

    assert_eq!(a.volatility, 0.0);
    assert_eq!(a.volatility, b.volatility);
    assert_eq!(a.slippage_pct, b.slippage_pct);
    assert_eq!(a.market_impact_pct, b.market_impact_pct);
    assert_eq!(a.net_cost, b.net_cost);
}

#[test]
fn test_estimate_composition() {
    let engine = CostEngine::new(EngineConfig::default()).unwrap();
    feed(&engine, 120);

    let quantity = 2.0;
    let estimate = engine
        .compute_metrics(&CostQuery::new(quantity, Side::Buy))
        .unwrap()
        .unwrap();

    assert!(estimate.slippage_pct >= 0.0);
    assert!(estimate.market_impact_pct > 0.0);
    assert!(estimate.volatility > 0.0);
    assert!((estimate.maker_prob + estimate.taker_prob - 1.0).abs() < 1e-9);
    assert_eq!(estimate.order_book_depth, 20);
    assert!(estimate.liquidity_estimate > 0.0);
    assert!(estimate.mean_update_interval_sec >= 0.0);
    assert!(estimate.processing_time_ms >= 0.0);

    let notional = estimate.mid_price * quantity;
    let expected = estimate.slippage_pct / 100.0 * notional
        + estimate.fee_amount
        + estimate.market_impact_pct / 100.0 * notional;
    assert_relative_eq!(estimate.net_cost, expected, epsilon = 1e-9);
}

#[test]
fn test_book_walk_against_latest_snapshot() {
    let engine = CostEngine::new(EngineConfig::default()).unwrap();
    engine.ingest_json(&payload(0, 100.0));

    let buy = engine.book_walk_slippage(1.0, Side::Buy).unwrap();
    let sell = engine.book_walk_slippage(1.0, Side::Sell).unwrap();
    // Best ask 100.05 / best bid 99.95 against mid 100
    assert_relative_eq!(buy, 0.05, epsilon = 1e-9);
    assert_relative_eq!(sell, 0.05, epsilon = 1e-9);
}

#[test]
fn test_walk_reference_case() {
    let levels = [
        tradecost_core::PriceLevel::new(100.0, 5.0),
        tradecost_core::PriceLevel::new(101.0, 5.0),
    ];
    // avg (5×100 + 3×101) / 8 = 100.375
    let slip = walk_slippage(&levels, 8.0, 100.0, Side::Buy);
    assert_relative_eq!(slip, 0.375, epsilon = 1e-12);
}

#[test]
fn test_constant_prices_zero_volatility() {
    let validator = tradecost_core::SnapshotValidator::default();
    let mut history = HistoryStore::new(100);
    for i in 0..40 {
        history.append(validator.validate_json(&payload(i, 100.0)).unwrap());
    }
    for window in 2..=40 {
        assert_eq!(features::volatility(&history, window, 93.6), Some(0.0));
    }
    let latest = history.latest().unwrap();
    assert!(features::spread(latest) >= 0.0);
    let imbalance = features::imbalance(latest, 10);
    assert!((-1.0..=1.0).contains(&imbalance));
    assert!(features::depth_ratio(latest) > EPSILON);
}

#[test]
fn test_concurrent_ingest_and_query() {
    init_logger();
    let engine = Arc::new(CostEngine::new(EngineConfig::default()).unwrap());
    // Readers always have data to answer from
    engine.ingest_json(&payload(0, mid_at(0)));

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 1..400 {
                engine.ingest_json(&payload(i, mid_at(i)));
            }
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|r| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let query = CostQuery::new(1.0 + r as f64, Side::Buy);
                for _ in 0..500 {
                    let estimate = engine.compute_metrics(&query).unwrap().unwrap();
                    assert!(estimate.net_cost.is_finite());
                    assert!(estimate.maker_prob >= 0.0 && estimate.maker_prob <= 1.0);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(engine.history_len(), 400);
    assert_eq!(engine.model_status().generation, 7);
    assert_eq!(engine.latency_summary().samples, 500);
}
