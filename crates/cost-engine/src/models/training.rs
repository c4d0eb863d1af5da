//! Training-set construction
//!
//! Scans consecutive history pairs (index ≥ 2) and emits one labelled
//! example per usable pair for each model. Features for historical pairs
//! see only the history prefix that existed at that point, with volatility
//! carried forward until a full window is available.

use log::debug;
use tradecost_core::OrderBookSnapshot;

use crate::config::EngineConfig;
use crate::features::{
    FeatureExtractor, MakerTakerFeatures, SlippageFeatures, mid_price, realized_volatility,
};
use crate::history::HistoryStore;

use super::MakerTakerClassifier;

/// Slippage features and relative executed-price move
pub type SlippageExample = ([f64; SlippageFeatures::LEN], f64);

/// Maker/taker features and label (1 = taker)
pub type MakerTakerExample = ([f64; MakerTakerFeatures::LEN], u8);

/// Labelled examples for one retraining cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub slippage: Vec<SlippageExample>,
    pub maker_taker: Vec<MakerTakerExample>,
    /// Retraining generation these examples belong to
    pub generation: u64,
    /// Pairs dropped for zero mid or non-finite values
    pub skipped: usize,
}

/// Volatility over the prefix ending at each index, carried forward while the window is short
struct PrefixVolatility {
    window: usize,
    annualization: f64,
    last: f64,
}

impl PrefixVolatility {
    fn new(window: usize, annualization: f64) -> Self {
        Self {
            window,
            annualization,
            last: 0.0,
        }
    }

    fn at(&mut self, history: &HistoryStore, index: usize) -> f64 {
        let len = index + 1;
        if len >= self.window {
            self.last = realized_volatility(history.range(len - self.window, len), self.annualization);
        }
        self.last
    }
}

impl TrainingSet {
    /// Build examples from the whole of `history`
    pub fn build(
        history: &HistoryStore,
        config: &EngineConfig,
        classifier: &MakerTakerClassifier,
        generation: u64,
    ) -> Self {
        let extractor = FeatureExtractor::new(config.features.clone());
        let annualization = config.features.annualization_factor();
        let mut slip_vol = PrefixVolatility::new(config.features.slippage_volatility_window, annualization);
        let mut mt_vol = PrefixVolatility::new(config.features.maker_taker_volatility_window, annualization);

        let mut set = TrainingSet {
            generation,
            ..Default::default()
        };

        for i in 2..history.size() {
            let (Some(current), Some(previous)) = (history.get(i), history.get(i - 1)) else {
                break;
            };
            let slippage_vol = slip_vol.at(history, i);
            let maker_taker_vol = mt_vol.at(history, i);

            match Self::example(
                &extractor,
                classifier,
                current,
                previous,
                i + 1,
                slippage_vol,
                maker_taker_vol,
            ) {
                Some((slippage, maker_taker)) => {
                    set.slippage.push(slippage);
                    set.maker_taker.push(maker_taker);
                }
                None => set.skipped += 1,
            }
        }

        if set.skipped > 0 {
            debug!(
                "training set gen {}: {} usable pairs, {} skipped",
                generation,
                set.slippage.len(),
                set.skipped
            );
        }
        set
    }

    fn example(
        extractor: &FeatureExtractor,
        classifier: &MakerTakerClassifier,
        current: &OrderBookSnapshot,
        previous: &OrderBookSnapshot,
        prefix_len: usize,
        slippage_vol: f64,
        maker_taker_vol: f64,
    ) -> Option<(SlippageExample, MakerTakerExample)> {
        let prev_mid = mid_price(previous);
        let best_ask = current.best_ask()?.price;
        if prev_mid <= 0.0 {
            return None;
        }

        // Buy-side convention: executed price is the current best ask
        let slippage_label = (best_ask - prev_mid) / prev_mid;
        let slippage =
            extractor.slippage_features(current, Some(previous), prefix_len, slippage_vol);
        let maker_taker =
            extractor.maker_taker_features(current, previous, prefix_len, maker_taker_vol);

        if !slippage_label.is_finite() || !slippage.is_finite() || !maker_taker.is_finite() {
            return None;
        }

        Some((
            (slippage.to_array(), slippage_label),
            (maker_taker.to_array(), classifier.label(best_ask, prev_mid)),
        ))
    }

    pub fn len(&self) -> usize {
        self.slippage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slippage.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tradecost_core::PriceLevel;

    fn snap(bid: f64, ask: f64) -> OrderBookSnapshot {
        let bids = (0..5).map(|i| PriceLevel::new(bid - i as f64, 1.0)).collect();
        let asks = (0..5).map(|i| PriceLevel::new(ask + i as f64, 1.0)).collect();
        OrderBookSnapshot::new(Utc::now(), bids, asks)
    }

    fn history(mids: &[f64]) -> HistoryStore {
        let mut h = HistoryStore::new(100);
        for m in mids {
            h.append(snap(m - 0.5, m + 0.5));
        }
        h
    }

    #[test]
    fn test_pairs_from_index_two() {
        let h = history(&[100.0; 10]);
        let set = TrainingSet::build(&h, &EngineConfig::default(), &MakerTakerClassifier::default(), 1);
        assert_eq!(set.len(), 8);
        assert_eq!(set.maker_taker.len(), 8);
        assert_eq!(set.skipped, 0);
        assert_eq!(set.generation, 1);
    }

    #[test]
    fn test_labels() {
        // Mid 100 then 101: ask 101.5 vs prev mid 100
        let h = history(&[100.0, 100.0, 100.0, 101.0]);
        let set = TrainingSet::build(&h, &EngineConfig::default(), &MakerTakerClassifier::default(), 1);
        let (_, last_label) = set.slippage[set.len() - 1];
        assert!((last_label - 0.015).abs() < 1e-12);
        assert_eq!(set.maker_taker[set.len() - 1].1, 0);

        // Falling: ask 99.5 < prev mid 101 -> taker
        let h = history(&[100.0, 101.0, 101.0, 99.0]);
        let set = TrainingSet::build(&h, &EngineConfig::default(), &MakerTakerClassifier::default(), 1);
        assert_eq!(set.maker_taker[set.len() - 1].1, 1);
    }

    #[test]
    fn test_zero_mid_pairs_skipped() {
        let mut h = history(&[100.0, 100.0, 100.0]);
        h.append(OrderBookSnapshot::new(Utc::now(), vec![], vec![PriceLevel::new(101.0, 1.0)]));
        h.append(snap(99.5, 100.5));
        let set = TrainingSet::build(&h, &EngineConfig::default(), &MakerTakerClassifier::default(), 1);
        // i=2 ok, i=3 ok (prev mid 100), i=4 skipped (prev mid 0)
        assert_eq!(set.len(), 2);
        assert_eq!(set.skipped, 1);
    }

    #[test]
    fn test_short_history_has_no_examples() {
        let h = history(&[100.0, 100.0]);
        let set = TrainingSet::build(&h, &EngineConfig::default(), &MakerTakerClassifier::default(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_volatility_carried_until_window() {
        // Constant mids give zero vol everywhere; rising mids give non-zero once the window fills
        let mids: Vec<f64> = (0..40).map(|i| 100.0 + (i % 2) as f64).collect();
        let h = history(&mids);
        let set = TrainingSet::build(&h, &EngineConfig::default(), &MakerTakerClassifier::default(), 1);
        // Slippage volatility is feature index 2; window 30 first fills at i = 29
        let vol_at = |i: usize| set.slippage[i - 2].0[2];
        assert_eq!(vol_at(28), 0.0);
        assert!(vol_at(29) > 0.0);
        // Maker/taker volatility is feature index 3; window 20 first fills at i = 19
        let mt_vol_at = |i: usize| set.maker_taker[i - 2].0[3];
        assert_eq!(mt_vol_at(18), 0.0);
        assert!(mt_vol_at(19) > 0.0);
    }
}
