//! Learned slippage regressor
//!
//! Predicts the relative move of the executed price away from the previous
//! mid, then scales it by order size and the caller's volatility
//! sensitivity:
//!
//! ```text
//! predicted% = max(0, f(features)) × 100
//! result     = predicted% × (1 + 2·sens) + min(0.5, q^0.8 × 0.001)
//! ```

use crate::config::{SlippageConfig, TrainingConfig};
use crate::error::FitError;
use crate::features::SlippageFeatures;

use super::calibration::{LinearFit, fit_robust_ridge};
use super::{FitReport, ModelState, SlippageExample};

const WIDTH: usize = SlippageFeatures::LEN;

/// Slippage regressor with size and sensitivity adjustments
#[derive(Debug, Clone, PartialEq)]
pub struct SlippageEstimator {
    state: ModelState<LinearFit<WIDTH>>,
    config: SlippageConfig,
}

impl SlippageEstimator {
    pub fn new(config: SlippageConfig) -> Self {
        Self {
            state: ModelState::Untrained,
            config,
        }
    }

    pub fn state(&self) -> &ModelState<LinearFit<WIDTH>> {
        &self.state
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_trained()
    }

    /// Model output in percent, clamped at 0. Zero when untrained.
    pub fn predict_pct(&self, features: &SlippageFeatures) -> f64 {
        let Some(fit) = self.state.params() else {
            return 0.0;
        };
        let raw = fit.predict(&features.to_array());
        if !raw.is_finite() {
            return 0.0;
        }
        raw.max(0.0) * 100.0
    }

    /// Non-linear size factor, capped
    pub fn size_factor(&self, quantity: f64) -> f64 {
        let factor = quantity.max(0.0).powf(self.config.size_exponent) * self.config.size_coefficient;
        factor.min(self.config.size_cap)
    }

    /// Expected slippage in percent for an order of `quantity`
    pub fn estimate(
        &self,
        features: &SlippageFeatures,
        quantity: f64,
        volatility_sensitivity: f64,
    ) -> f64 {
        let multiplier = 1.0 + self.config.sensitivity_slope * volatility_sensitivity;
        self.predict_pct(features) * multiplier + self.size_factor(quantity)
    }

    /// Fit on `samples`, returning a new estimator. `self` is never modified.
    pub fn retrained(
        &self,
        samples: &[SlippageExample],
        training: &TrainingConfig,
        generation: u64,
    ) -> Result<Self, FitError> {
        if samples.len() < training.min_regression_samples {
            return Err(FitError::InsufficientSamples {
                found: samples.len(),
                required: training.min_regression_samples,
            });
        }

        let (x, y): (Vec<[f64; WIDTH]>, Vec<f64>) = samples.iter().copied().unzip();
        let fit = fit_robust_ridge(&x, &y, training)?;

        let report = FitReport {
            samples: samples.len(),
            generation,
            score: fit.stats.r_squared,
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

impl Default for SlippageEstimator {
    fn default() -> Self {
        Self::new(SlippageConfig::default())
    }
}
