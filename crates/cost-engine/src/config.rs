//! Engine configuration
//!
//! Every tunable constant of the engine lives here with its production
//! default. Configs load from JSON; missing sections and fields fall back to
//! the defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tradecost_core::{FeeSchedule, MIN_LEVELS};

use crate::error::{Error, Result};

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum snapshots kept in history (oldest evicted first)
    pub history_capacity: usize,
    /// Minimum levels per side for a snapshot to be accepted
    pub min_levels: usize,
    pub features: FeatureConfig,
    pub training: TrainingConfig,
    pub slippage: SlippageConfig,
    pub maker_taker: MakerTakerConfig,
    pub impact: ImpactConfig,
    pub metrics: MetricsConfig,
    pub fees: FeeSchedule,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 2000,
            min_levels: MIN_LEVELS,
            features: FeatureConfig::default(),
            training: TrainingConfig::default(),
            slippage: SlippageConfig::default(),
            maker_taker: MakerTakerConfig::default(),
            impact: ImpactConfig::default(),
            metrics: MetricsConfig::default(),
            fees: FeeSchedule::default(),
        }
    }
}

/// Feature extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Levels per side summed for order book imbalance
    pub imbalance_depth: usize,
    /// Volatility window for slippage features and impact
    pub slippage_volatility_window: usize,
    /// Volatility window for maker/taker features
    pub maker_taker_volatility_window: usize,
    /// History length required before price change is non-zero
    pub price_change_min_history: usize,
    /// Periods per year used to annualise volatility (hourly bars)
    pub annualization_periods: f64,
}

impl FeatureConfig {
    /// √periods, the annualisation multiplier
    pub fn annualization_factor(&self) -> f64 {
        self.annualization_periods.sqrt()
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            imbalance_depth: 10,
            slippage_volatility_window: 30,
            maker_taker_volatility_window: 20,
            price_change_min_history: 5,
            annualization_periods: 365.0 * 24.0,
        }
    }
}

/// Retraining cadence and fit parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Retrain every N accepted snapshots
    pub retrain_interval: u64,
    /// History required before any retraining happens
    pub min_history: usize,
    /// Usable examples required to fit the slippage regressor
    pub min_regression_samples: usize,
    /// Distinct label classes required to fit the classifier
    pub min_classes: usize,
    /// L2 penalty for the regressor (standardised features)
    pub ridge_penalty: f64,
    /// Huber re-weighting passes after the initial fit
    pub robust_iterations: usize,
    /// Residual threshold (in robust std devs) before down-weighting
    pub outlier_threshold: f64,
    /// Gradient steps for the logistic classifier
    pub logistic_max_iter: usize,
    /// Gradient step size for the logistic classifier
    pub logistic_learning_rate: f64,
    /// L2 penalty for the logistic classifier
    pub logistic_penalty: f64,
    /// Stop when the largest gradient component falls below this
    pub logistic_tolerance: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            retrain_interval: 50,
            min_history: 100,
            min_regression_samples: 20,
            min_classes: 2,
            ridge_penalty: 0.01,
            robust_iterations: 3,
            outlier_threshold: 3.0,
            logistic_max_iter: 500,
            logistic_learning_rate: 0.5,
            logistic_penalty: 0.01,
            logistic_tolerance: 1e-6,
        }
    }
}

/// Size and sensitivity adjustments applied to the learned slippage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlippageConfig {
    /// Exponent on quantity in the size factor
    pub size_exponent: f64,
    /// Coefficient on quantity^exponent
    pub size_coefficient: f64,
    /// Cap on the size factor (percentage points)
    pub size_cap: f64,
    /// Multiplier slope: 1 + slope × volatility sensitivity
    pub sensitivity_slope: f64,
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self {
            size_exponent: 0.8,
            size_coefficient: 0.001,
            size_cap: 0.5,
            sensitivity_slope: 2.0,
        }
    }
}

/// Maker/taker classifier labelling and fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MakerTakerConfig {
    /// History required before the model is consulted
    pub min_history: usize,
    /// Fallback maker probability
    pub default_maker: f64,
    /// Fallback taker probability
    pub default_taker: f64,
    /// Label taker when best ask < previous mid × threshold
    pub taker_threshold: f64,
}

impl Default for MakerTakerConfig {
    fn default() -> Self {
        Self {
            min_history: 50,
            default_maker: 0.7,
            default_taker: 0.3,
            taker_threshold: 1.0001,
        }
    }
}

/// Almgren-Chriss style impact coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    /// History required before impact is recomputed
    pub min_history: usize,
    /// Weights for immediate (0..5), near (5..10) and deep (10..20) liquidity
    pub tier_weights: [f64; 3],
    /// η = eta_base + eta_volatility × σ
    pub eta_base: f64,
    pub eta_volatility: f64,
    /// γ = gamma_base + gamma_volatility × σ
    pub gamma_base: f64,
    pub gamma_volatility: f64,
    /// Exponent on size ratio for temporary impact
    pub temporary_exponent: f64,
    /// Exponent on size ratio for permanent impact
    pub permanent_exponent: f64,
    /// Sensitivity multiplier: base + slope × volatility sensitivity
    pub sensitivity_base: f64,
    pub sensitivity_slope: f64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            min_history: 20,
            tier_weights: [0.6, 0.3, 0.1],
            eta_base: 0.05,
            eta_volatility: 0.15,
            gamma_base: 0.01,
            gamma_volatility: 0.04,
            temporary_exponent: 0.7,
            permanent_exponent: 0.5,
            sensitivity_base: 0.8,
            sensitivity_slope: 0.4,
        }
    }
}

/// Latency/throughput bookkeeping windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Processing-time samples kept
    pub processing_window: usize,
    /// Inter-arrival samples kept
    pub interval_window: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            processing_window: 500,
            interval_window: 500,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::InvalidConfig(msg.to_string()));

        if self.history_capacity == 0 {
            return invalid("history_capacity must be > 0");
        }
        if self.min_levels == 0 {
            return invalid("min_levels must be > 0");
        }
        if self.training.retrain_interval == 0 {
            return invalid("training.retrain_interval must be > 0");
        }
        if self.features.slippage_volatility_window < 2
            || self.features.maker_taker_volatility_window < 2
        {
            return invalid("volatility windows must be >= 2");
        }
        if self.features.annualization_periods <= 0.0 {
            return invalid("features.annualization_periods must be > 0");
        }
        let split = self.maker_taker.default_maker + self.maker_taker.default_taker;
        if (split - 1.0).abs() > 1e-9 {
            return invalid("maker_taker default split must sum to 1");
        }
        if self.metrics.processing_window == 0 || self.metrics.interval_window == 0 {
            return invalid("metrics windows must be > 0");
        }
        Ok(())
    }
}

/// Load engine configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<EngineConfig> {
    let config: EngineConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}
