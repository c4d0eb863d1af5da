//! Latency and feed-rate bookkeeping
//!
//! Rolling windows over query processing times and snapshot inter-arrival
//! intervals. Timing is observational: nothing here feeds back into cost
//! estimates.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

use crate::config::MetricsConfig;

/// Fixed-size rolling window with a running sum for O(1) means
#[derive(Debug, Clone)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
    sum: f64,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
        }
    }

    #[inline]
    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.capacity {
            if let Some(removed) = self.values.pop_front() {
                self.sum -= removed;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.sum / self.values.len() as f64)
    }

    /// Linear-interpolated quantile, `q` in [0, 1]
    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let mut sorted: Vec<f64> = self.values.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        let frac = rank - lo as f64;
        Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
    }

    pub fn median(&self) -> Option<f64> {
        self.quantile(0.5)
    }
}

/// Query latency percentiles in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub samples: usize,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    processing_ms: RollingWindow,
    intervals_sec: RollingWindow,
    last_arrival: Option<Instant>,
}

impl MetricsAggregator {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            processing_ms: RollingWindow::new(config.processing_window),
            intervals_sec: RollingWindow::new(config.interval_window),
            last_arrival: None,
        }
    }

    pub fn record_processing(&mut self, ms: f64) {
        if ms.is_finite() && ms >= 0.0 {
            self.processing_ms.push(ms);
        }
    }

    /// Record an accepted snapshot arrival. The first arrival only sets the reference point.
    pub fn record_arrival(&mut self, at: Instant) {
        if let Some(prev) = self.last_arrival {
            self.intervals_sec
                .push(at.saturating_duration_since(prev).as_secs_f64());
        }
        self.last_arrival = Some(at);
    }

    /// Median processing time; 0 before any query
    pub fn median_processing_ms(&self) -> f64 {
        self.processing_ms.median().unwrap_or(0.0)
    }

    /// Mean inter-arrival interval; 0 before two arrivals
    pub fn mean_update_interval_sec(&self) -> f64 {
        self.intervals_sec.mean().unwrap_or(0.0)
    }

    /// Snapshots per second implied by the mean interval; 0 when unknown
    pub fn update_frequency_hz(&self) -> f64 {
        let mean = self.mean_update_interval_sec();
        if mean > 0.0 { 1.0 / mean } else { 0.0 }
    }

    pub fn latency_summary(&self) -> LatencySummary {
        let q = |p| self.processing_ms.quantile(p).unwrap_or(0.0);
        LatencySummary {
            samples: self.processing_ms.len(),
            mean_ms: self.processing_ms.mean().unwrap_or(0.0),
            p50_ms: q(0.50),
            p95_ms: q(0.95),
            p99_ms: q(0.99),
        }
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(&MetricsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    #[test]
    fn test_window_evicts_and_tracks_sum() {
        let mut w = RollingWindow::new(3);
        for v in [1.0, 2.0, 3.0, 10.0] {
            w.push(v);
        }
        assert_eq!(w.len(), 3);
        assert_relative_eq!(w.mean().unwrap(), 5.0);
    }

    #[test]
    fn test_median_even_and_odd() {
        let mut w = RollingWindow::new(10);
        for v in [4.0, 1.0, 3.0] {
            w.push(v);
        }
        assert_eq!(w.median(), Some(3.0));
        w.push(2.0);
        assert_relative_eq!(w.median().unwrap(), 2.5);
    }

    #[test]
    fn test_quantiles() {
        let mut w = RollingWindow::new(200);
        for v in 1..=101 {
            w.push(v as f64);
        }
        assert_relative_eq!(w.quantile(0.95).unwrap(), 96.0, epsilon = 1e-9);
        assert_relative_eq!(w.quantile(0.0).unwrap(), 1.0);
        assert_relative_eq!(w.quantile(1.0).unwrap(), 101.0);
        assert_eq!(RollingWindow::new(5).quantile(0.5), None);
    }

    #[test]
    fn test_processing_window_bounded() {
        let mut m = MetricsAggregator::default();
        for i in 0..600 {
            m.record_processing(i as f64);
        }
        let summary = m.latency_summary();
        assert_eq!(summary.samples, 500);
        // Window holds 100..=599
        assert_relative_eq!(m.median_processing_ms(), 349.5);
    }

    #[test]
    fn test_arrival_intervals() {
        let mut m = MetricsAggregator::default();
        assert_eq!(m.update_frequency_hz(), 0.0);

        let t0 = Instant::now();
        m.record_arrival(t0);
        assert_eq!(m.mean_update_interval_sec(), 0.0);

        m.record_arrival(t0 + Duration::from_millis(100));
        m.record_arrival(t0 + Duration::from_millis(300));
        assert_relative_eq!(m.mean_update_interval_sec(), 0.15, epsilon = 1e-9);
        assert_relative_eq!(m.update_frequency_hz(), 1.0 / 0.15, epsilon = 1e-6);
    }

    #[test]
    fn test_rejects_invalid_processing_samples() {
        let mut m = MetricsAggregator::default();
        m.record_processing(f64::NAN);
        m.record_processing(-1.0);
        assert_eq!(m.latency_summary().samples, 0);
    }
}
