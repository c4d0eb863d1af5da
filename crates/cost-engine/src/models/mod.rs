//! Predictive Models
//!
//! Two learned models share one lifecycle: constructed untrained, refit on
//! the retraining cadence, replaced whole on success and left untouched on
//! failure.
//!
//! ```text
//!   Untrained ──fit ok──▶ Trained(params, report)
//!       │                   │   ▲
//!    fit err             fit err │ fit ok (new params)
//!       ▼                   ▼   │
//!   Untrained            Trained(previous params)
//! ```
//!
//! A model never transitions back to `Untrained`.

pub mod calibration;
pub mod maker_taker;
pub mod slippage;
pub mod training;

pub use calibration::{LinearFit, LogisticFit, RegressionStats};
pub use maker_taker::{MakerTakerClassifier, MakerTakerSplit};
pub use slippage::SlippageEstimator;
pub use training::{MakerTakerExample, SlippageExample, TrainingSet};

use serde::{Deserialize, Serialize};

/// Summary of a successful fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Usable examples the fit saw
    pub samples: usize,
    /// Retraining generation that produced these parameters
    pub generation: u64,
    /// R² for the regressor, balanced accuracy for the classifier
    pub score: f64,
    /// Solver iterations
    pub iterations: usize,
}

/// Lifecycle state of a learned model
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ModelState<P> {
    #[default]
    Untrained,
    Trained { params: P, report: FitReport },
}

impl<P> ModelState<P> {
    pub fn is_trained(&self) -> bool {
        matches!(self, ModelState::Trained { .. })
    }

    pub fn params(&self) -> Option<&P> {
        match self {
            ModelState::Trained { params, .. } => Some(params),
            ModelState::Untrained => None,
        }
    }

    pub fn report(&self) -> Option<&FitReport> {
        match self {
            ModelState::Trained { report, .. } => Some(report),
            ModelState::Untrained => None,
        }
    }
}
