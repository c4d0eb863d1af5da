//! Model Calibration
//!
//! Numeric fitting routines behind the slippage regressor and the
//! maker/taker classifier.
//!
//! # Methods
//!
//! - **Standardisation**: per-feature z-scoring so one penalty fits all
//! - **Robust Ridge Regression**: weighted least squares with an L2 penalty,
//!   re-weighted with Huber-style weights from MAD-scaled residuals
//! - **Logistic Regression**: class-balanced, L2-penalised, batch gradient
//!   descent
//!
//! All routines are deterministic: the same inputs always produce the same
//! parameters.

use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;
use crate::error::FitError;

/// Pivot magnitude below which the normal equations are treated as singular
const PIVOT_EPSILON: f64 = 1e-12;

/// MAD to σ conversion for normally distributed residuals
const MAD_TO_SIGMA: f64 = 1.4826;

/// Per-feature mean/scale learned from training rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standardizer<const N: usize> {
    mean: [f64; N],
    scale: [f64; N],
}

impl<const N: usize> Standardizer<N> {
    /// Identity transform
    pub fn identity() -> Self {
        Self {
            mean: [0.0; N],
            scale: [1.0; N],
        }
    }

    /// Learn mean and population std-dev per column. Constant columns get scale 1.
    pub fn fit(rows: &[[f64; N]]) -> Self {
        if rows.is_empty() {
            return Self::identity();
        }
        let n = rows.len() as f64;
        let mut mean = [0.0; N];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in mean.iter_mut() {
            *m /= n;
        }

        let mut scale = [0.0; N];
        for row in rows {
            for j in 0..N {
                let d = row[j] - mean[j];
                scale[j] += d * d;
            }
        }
        for s in scale.iter_mut() {
            *s = (*s / n).sqrt();
            if !s.is_finite() || *s < PIVOT_EPSILON {
                *s = 1.0;
            }
        }
        Self { mean, scale }
    }

    #[inline]
    pub fn transform(&self, x: &[f64; N]) -> [f64; N] {
        let mut out = [0.0; N];
        for j in 0..N {
            out[j] = (x[j] - self.mean[j]) / self.scale[j];
        }
        out
    }
}

/// Goodness-of-fit on the (weighted) training set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionStats {
    pub r_squared: f64,
    pub rmse: f64,
    pub mae: f64,
}

/// Fitted linear model over standardised features
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit<const N: usize> {
    pub standardizer: Standardizer<N>,
    pub intercept: f64,
    pub coefficients: [f64; N],
    pub stats: RegressionStats,
    /// Weighted solves performed (1 + re-weighting passes)
    pub iterations: usize,
}

impl<const N: usize> LinearFit<N> {
    /// Raw prediction for an unstandardised feature vector
    #[inline]
    pub fn predict(&self, x: &[f64; N]) -> f64 {
        let z = self.standardizer.transform(x);
        self.intercept + dot(&self.coefficients, &z)
    }
}

/// Fitted logistic model over standardised features
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticFit<const N: usize> {
    pub standardizer: Standardizer<N>,
    pub intercept: f64,
    pub coefficients: [f64; N],
    /// Balanced training accuracy at 0.5
    pub accuracy: f64,
    pub iterations: usize,
}

impl<const N: usize> LogisticFit<N> {
    /// P(label = 1)
    #[inline]
    pub fn predict_proba(&self, x: &[f64; N]) -> f64 {
        let z = self.standardizer.transform(x);
        sigmoid(self.intercept + dot(&self.coefficients, &z))
    }
}

#[inline]
fn dot<const N: usize>(a: &[f64; N], b: &[f64; N]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn sigmoid(t: f64) -> f64 {
    if t >= 0.0 {
        1.0 / (1.0 + (-t).exp())
    } else {
        let e = t.exp();
        e / (1.0 + e)
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    values[values.len() / 2]
}

/// Huber-style weights: 1 inside `threshold` robust σ of the median, decaying beyond
pub fn robust_weights(values: &[f64], threshold: f64) -> Vec<f64> {
    if values.is_empty() {
        return vec![];
    }
    let center = median(&mut values.to_vec());
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    let scale = median(&mut deviations) * MAD_TO_SIGMA;

    values
        .iter()
        .map(|v| {
            if scale <= PIVOT_EPSILON {
                return 1.0;
            }
            let z = (v - center).abs() / scale;
            if z <= threshold { 1.0 } else { threshold / z }
        })
        .collect()
}

/// Solve `a · x = b` in place (row-major `dim × dim`), partial pivoting
fn solve_linear_system(a: &mut [f64], b: &mut [f64], dim: usize) -> Result<Vec<f64>, FitError> {
    for col in 0..dim {
        let pivot_row = (col..dim)
            .max_by(|&i, &j| a[i * dim + col].abs().total_cmp(&a[j * dim + col].abs()))
            .unwrap_or(col);
        if a[pivot_row * dim + col].abs() < PIVOT_EPSILON {
            return Err(FitError::Singular);
        }
        if pivot_row != col {
            for k in 0..dim {
                a.swap(col * dim + k, pivot_row * dim + k);
            }
            b.swap(col, pivot_row);
        }

        let pivot = a[col * dim + col];
        for row in (col + 1)..dim {
            let factor = a[row * dim + col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..dim {
                a[row * dim + k] -= factor * a[col * dim + k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; dim];
    for row in (0..dim).rev() {
        let mut acc = b[row];
        for k in (row + 1)..dim {
            acc -= a[row * dim + k] * x[k];
        }
        x[row] = acc / a[row * dim + row];
    }

    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(FitError::NonFinite)
    }
}

/// One weighted ridge solve. Returns (intercept, coefficients); the intercept is not penalised.
fn weighted_ridge<const N: usize>(
    x: &[[f64; N]],
    y: &[f64],
    w: &[f64],
    penalty: f64,
) -> Result<(f64, [f64; N]), FitError> {
    let dim = N + 1;
    let mut a = vec![0.0; dim * dim];
    let mut b = vec![0.0; dim];

    for ((row, target), weight) in x.iter().zip(y).zip(w) {
        // Column 0 is the intercept
        let design = |i: usize| if i == 0 { 1.0 } else { row[i - 1] };
        for i in 0..dim {
            let wi = weight * design(i);
            b[i] += wi * target;
            for j in 0..dim {
                a[i * dim + j] += wi * design(j);
            }
        }
    }
    for j in 1..dim {
        a[j * dim + j] += penalty;
    }

    let solution = solve_linear_system(&mut a, &mut b, dim)?;
    let mut coefficients = [0.0; N];
    coefficients.copy_from_slice(&solution[1..]);
    Ok((solution[0], coefficients))
}

fn regression_stats(predictions: &[f64], y: &[f64], w: &[f64]) -> RegressionStats {
    let sum_w: f64 = w.iter().sum();
    if sum_w <= 0.0 {
        return RegressionStats::default();
    }
    let y_mean = y.iter().zip(w).map(|(t, wi)| t * wi).sum::<f64>() / sum_w;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    let mut abs_err = 0.0;
    for ((p, t), wi) in predictions.iter().zip(y).zip(w) {
        let resid = t - p;
        ss_res += wi * resid * resid;
        ss_tot += wi * (t - y_mean) * (t - y_mean);
        abs_err += wi * resid.abs();
    }

    RegressionStats {
        r_squared: if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 },
        rmse: (ss_res / sum_w).sqrt(),
        mae: abs_err / sum_w,
    }
}

/// Robust ridge regression of `y` on `x`.
///
/// Initial weights come from the target distribution; each further pass
/// re-weights by the previous fit's residuals.
pub fn fit_robust_ridge<const N: usize>(
    x: &[[f64; N]],
    y: &[f64],
    config: &TrainingConfig,
) -> Result<LinearFit<N>, FitError> {
    if x.len() != y.len() || x.is_empty() {
        return Err(FitError::InsufficientSamples {
            found: x.len().min(y.len()),
            required: 1,
        });
    }

    let standardizer = Standardizer::fit(x);
    let z: Vec<[f64; N]> = x.iter().map(|row| standardizer.transform(row)).collect();

    let mut weights = robust_weights(y, config.outlier_threshold);
    let (mut intercept, mut coefficients) =
        weighted_ridge(&z, y, &weights, config.ridge_penalty)?;
    let mut iterations = 1;

    for _ in 0..config.robust_iterations {
        let residuals: Vec<f64> = z
            .iter()
            .zip(y)
            .map(|(row, t)| t - (intercept + dot(&coefficients, row)))
            .collect();
        weights = robust_weights(&residuals, config.outlier_threshold);
        (intercept, coefficients) = weighted_ridge(&z, y, &weights, config.ridge_penalty)?;
        iterations += 1;
    }

    let predictions: Vec<f64> = z
        .iter()
        .map(|row| intercept + dot(&coefficients, row))
        .collect();
    let stats = regression_stats(&predictions, y, &weights);

    if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
        return Err(FitError::NonFinite);
    }

    Ok(LinearFit {
        standardizer,
        intercept,
        coefficients,
        stats,
        iterations,
    })
}

/// Class-balanced, L2-penalised logistic regression. Labels are 0 or 1.
pub fn fit_logistic<const N: usize>(
    x: &[[f64; N]],
    labels: &[u8],
    config: &TrainingConfig,
) -> Result<LogisticFit<N>, FitError> {
    let n = x.len().min(labels.len());
    let positives = labels[..n].iter().filter(|l| **l == 1).count();
    let negatives = n - positives;
    let classes = usize::from(positives > 0) + usize::from(negatives > 0);
    if classes < 2 {
        return Err(FitError::TooFewClasses {
            found: classes,
            required: 2,
        });
    }

    let standardizer = Standardizer::fit(&x[..n]);
    let z: Vec<[f64; N]> = x[..n].iter().map(|row| standardizer.transform(row)).collect();

    // Balanced weights n / (2 · n_class), normalised by n
    let w_pos = n as f64 / (2.0 * positives as f64);
    let w_neg = n as f64 / (2.0 * negatives as f64);
    let inv_n = 1.0 / n as f64;

    let mut intercept = 0.0;
    let mut coefficients = [0.0; N];
    let mut iterations = 0;

    for _ in 0..config.logistic_max_iter {
        iterations += 1;
        let mut grad_b = 0.0;
        let mut grad_w = [0.0; N];

        for (row, label) in z.iter().zip(&labels[..n]) {
            let p = sigmoid(intercept + dot(&coefficients, row));
            let (target, weight) = if *label == 1 { (1.0, w_pos) } else { (0.0, w_neg) };
            let err = weight * (p - target) * inv_n;
            grad_b += err;
            for j in 0..N {
                grad_w[j] += err * row[j];
            }
        }
        for j in 0..N {
            grad_w[j] += config.logistic_penalty * coefficients[j];
        }

        intercept -= config.logistic_learning_rate * grad_b;
        for j in 0..N {
            coefficients[j] -= config.logistic_learning_rate * grad_w[j];
        }

        let max_grad = grad_w.iter().fold(grad_b.abs(), |m, g| m.max(g.abs()));
        if max_grad < config.logistic_tolerance {
            break;
        }
    }

    if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let fit = LogisticFit {
        standardizer,
        intercept,
        coefficients,
        accuracy: 0.0,
        iterations,
    };

    // Balanced accuracy: mean of per-class recall
    let (mut hit_pos, mut hit_neg) = (0usize, 0usize);
    for (row, label) in x[..n].iter().zip(&labels[..n]) {
        let predicted = fit.predict_proba(row) >= 0.5;
        match (*label == 1, predicted) {
            (true, true) => hit_pos += 1,
            (false, false) => hit_neg += 1,
            _ => {}
        }
    }
    let accuracy = 0.5 * (hit_pos as f64 / positives as f64 + hit_neg as f64 / negatives as f64);

    Ok(LogisticFit { accuracy, ..fit })
}
