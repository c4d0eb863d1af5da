//! Cost engine errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Why a model refit did not produce new parameters.
///
/// Never escapes retraining: the previous parameters stay in effect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("insufficient samples: found {found}, required {required}")]
    InsufficientSamples { found: usize, required: usize },

    #[error("training labels contain {found} class(es), need {required}")]
    TooFewClasses { found: usize, required: usize },

    #[error("normal equations are singular")]
    Singular,

    #[error("fit produced non-finite parameters")]
    NonFinite,
}

impl FitError {
    /// Data-sufficiency gate rather than a numerical failure
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            FitError::InsufficientSamples { .. } | FitError::TooFewClasses { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_classification() {
        assert!(FitError::InsufficientSamples { found: 3, required: 20 }.is_insufficient_data());
        assert!(FitError::TooFewClasses { found: 1, required: 2 }.is_insufficient_data());
        assert!(!FitError::Singular.is_insufficient_data());
        assert!(!FitError::NonFinite.is_insufficient_data());
    }

    #[test]
    fn test_error_variants_are_caller_facing() {
        // Fit failures stay inside retraining; only config and query errors reach callers
        let errors = [
            Error::InvalidConfig("history_capacity must be > 0".to_string()),
            Error::InvalidQuery("quantity must be positive, got 0".to_string()),
            Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "engine.json")),
        ];
        for error in &errors {
            match error {
                Error::Io(_) | Error::Parse(_) => assert!(error.to_string().starts_with("Failed to")),
                Error::InvalidConfig(msg) | Error::InvalidQuery(msg) => {
                    assert!(error.to_string().ends_with(msg.as_str()))
                }
            }
        }
    }
}
