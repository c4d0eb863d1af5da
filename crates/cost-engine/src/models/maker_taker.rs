//! Maker/taker classifier
//!
//! Estimates whether the next fill is likely to be passive (maker) or
//! aggressive (taker). Label 1 is taker. Any condition that prevents a
//! confident prediction falls back to the configured default split.

use serde::{Deserialize, Serialize};

use crate::config::{MakerTakerConfig, TrainingConfig};
use crate::error::FitError;
use crate::features::MakerTakerFeatures;

use super::calibration::{LogisticFit, fit_logistic};
use super::{FitReport, MakerTakerExample, ModelState};

const WIDTH: usize = MakerTakerFeatures::LEN;

/// Probability split between maker and taker execution; sums to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MakerTakerSplit {
    pub maker: f64,
    pub taker: f64,
}

impl MakerTakerSplit {
    /// Build from P(taker), clamped to [0, 1]
    pub fn from_taker(taker: f64) -> Self {
        let taker = taker.clamp(0.0, 1.0);
        Self {
            maker: 1.0 - taker,
            taker,
        }
    }

    /// Maker fee rate applies when maker is strictly more likely
    pub fn is_maker(&self) -> bool {
        self.maker > 0.5
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MakerTakerClassifier {
    state: ModelState<LogisticFit<WIDTH>>,
    config: MakerTakerConfig,
}

impl MakerTakerClassifier {
    pub fn new(config: MakerTakerConfig) -> Self {
        Self {
            state: ModelState::Untrained,
            config,
        }
    }

    pub fn state(&self) -> &ModelState<LogisticFit<WIDTH>> {
        &self.state
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_trained()
    }

    pub fn default_split(&self) -> MakerTakerSplit {
        MakerTakerSplit {
            maker: self.config.default_maker,
            taker: self.config.default_taker,
        }
    }

    /// Label for one (previous, current) pair: 1 if the current best ask sits below prev mid × threshold
    pub fn label(&self, current_best_ask: f64, previous_mid: f64) -> u8 {
        u8::from(current_best_ask < previous_mid * self.config.taker_threshold)
    }

    /// Maker/taker split. Never fails; degrades to the default split.
    pub fn predict(&self, features: &MakerTakerFeatures, history_len: usize) -> MakerTakerSplit {
        if history_len < self.config.min_history || !features.is_finite() {
            return self.default_split();
        }
        let Some(fit) = self.state.params() else {
            return self.default_split();
        };
        let taker = fit.predict_proba(&features.to_array());
        if !taker.is_finite() {
            return self.default_split();
        }
        MakerTakerSplit::from_taker(taker)
    }

    /// Fit on `samples`, returning a new classifier. `self` is never modified.
    pub fn retrained(
        &self,
        samples: &[MakerTakerExample],
        training: &TrainingConfig,
        generation: u64,
    ) -> Result<Self, FitError> {
        let has_taker = samples.iter().any(|(_, label)| *label == 1);
        let has_maker = samples.iter().any(|(_, label)| *label == 0);
        let classes = usize::from(has_taker) + usize::from(has_maker);
        if classes < training.min_classes {
            return Err(FitError::TooFewClasses {
                found: classes,
                required: training.min_classes,
            });
        }

        let (x, labels): (Vec<[f64; WIDTH]>, Vec<u8>) = samples.iter().copied().unzip();
        let fit = fit_logistic(&x, &labels, training)?;

        let report = FitReport {
            samples: samples.len(),
            generation,
            score: fit.accuracy,
            iterations: fit.iterations,
        };
        Ok(Self {
            state: ModelState::Trained {
                params: fit,
                report,
            },
            config: self.config.clone(),
        })
    }
}

impl Default for MakerTakerClassifier {
    fn default() -> Self {
        Self::new(MakerTakerConfig::default())
    }
}
