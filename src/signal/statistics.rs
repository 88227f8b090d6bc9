//! Summary statistics of a traced graph
//!
//! Converts traced rows to values through the scale calibration and derives
//! maximum, minimum, current value and the first payout-like rise. Absent
//! columns are skipped, never interpolated.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calibration::ScaleCalibration;
use crate::config::StatisticsConfig;
use crate::detection::ProfileTrace;
use crate::signal::TracedSignal;
use crate::{AnalysisError, Result};

/// Derived graph statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Largest value, floored at zero when the graph never goes positive
    pub maximum: f64,
    /// Column of the maximum; `None` when the zero floor applies
    pub max_column: Option<usize>,
    pub minimum: f64,
    pub min_column: usize,
    /// Value at the right-most present column
    pub current: f64,
    pub current_column: usize,
    /// Column just before the first sustained rise from near baseline
    pub first_hit_index: Option<usize>,
    /// Value at `first_hit_index`
    pub first_hit_value: Option<f64>,
    pub present_columns: usize,
}

/// Statistics extractor
#[derive(Debug, Clone, Default)]
pub struct StatisticsExtractor {
    config: StatisticsConfig,
}

impl StatisticsExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StatisticsConfig) -> Self {
        Self { config }
    }

    /// Per-column values, clamped to the configured limit
    pub fn values(&self, signal: &TracedSignal, calibration: &ScaleCalibration) -> Vec<Option<f64>> {
        signal
            .samples()
            .iter()
            .map(|sample| sample.map(|y| self.clamp(calibration.value_at(y))))
            .collect()
    }

    /// Compute statistics for a traced profile
    ///
    /// # Errors
    ///
    /// Returns `InsufficientSignal` if the trace has fewer present columns
    /// than required (never fewer than one)
    pub fn extract(&self, trace: &ProfileTrace, calibration: &ScaleCalibration) -> Result<Statistics> {
        let values = self.values(&trace.signal, calibration);
        let stats = self.extract_values(&trace.profile, &values)?;

        info!(
            profile = %trace.profile,
            maximum = stats.maximum,
            minimum = stats.minimum,
            current = stats.current,
            first_hit = ?stats.first_hit_index,
            "statistics extracted"
        );
        Ok(stats)
    }

    /// Compute statistics from per-column values
    pub fn extract_values(&self, profile: &str, values: &[Option<f64>]) -> Result<Statistics> {
        let present: Vec<(usize, f64)> = values
            .iter()
            .enumerate()
            .filter_map(|(column, v)| v.map(|v| (column, v)))
            .collect();

        let required = self.config.min_present_columns.max(1);
        if present.len() < required {
            return Err(AnalysisError::InsufficientSignal {
                profile: profile.to_string(),
                present: present.len(),
                required,
            });
        }

        // present is non-empty past the check above
        let mut max = present[0];
        let mut min = present[0];
        for &(column, v) in &present[1..] {
            if v > max.1 {
                max = (column, v);
            }
            if v < min.1 {
                min = (column, v);
            }
        }
        let current = present[present.len() - 1];

        let (maximum, max_column) = if max.1 < 0.0 { (0.0, None) } else { (max.1, Some(max.0)) };

        let first_hit_index = self.first_hit(values);
        let first_hit_value = first_hit_index.and_then(|i| values[i]);

        Ok(Statistics {
            maximum,
            max_column,
            minimum: min.1,
            min_column: min.0,
            current: current.1,
            current_column: current.0,
            first_hit_index,
            first_hit_value,
            present_columns: present.len(),
        })
    }

    /// Index of the first sustained rise from near baseline
    ///
    /// Column `i` qualifies when `v[i+1] - v[i]` exceeds the minimum rise,
    /// `v[i+2]` stays within the rebound tolerance of `v[i+1]`, and `v[i]` is
    /// below the baseline ceiling. Only the first `first_hit_window` columns
    /// are scanned; a column with any absent point in the triple does not
    /// qualify.
    pub fn first_hit(&self, values: &[Option<f64>]) -> Option<usize> {
        let cfg = &self.config;
        let limit = values.len().saturating_sub(2).min(cfg.first_hit_window);

        let primary = (0..limit).find(|&i| self.qualifies(values, i));
        if primary.is_some() || !cfg.trend_fallback {
            return primary;
        }

        self.trend_reversal(values)
    }

    /// Rise after a flat or falling stretch, anywhere in the series
    fn trend_reversal(&self, values: &[Option<f64>]) -> Option<usize> {
        let window = self.config.trend_window.max(2);

        (window..values.len().saturating_sub(2)).find(|&i| {
            let past: Vec<f64> = values[i - window..i].iter().flatten().copied().collect();
            if past.len() < 2 {
                return false;
            }
            let slope = (past[past.len() - 1] - past[0]) / past.len() as f64;
            slope <= 0.0 && self.qualifies(values, i)
        })
    }

    fn qualifies(&self, values: &[Option<f64>], i: usize) -> bool {
        let cfg = &self.config;
        let (Some(Some(a)), Some(Some(b)), Some(Some(c))) = (values.get(i), values.get(i + 1), values.get(i + 2))
        else {
            return false;
        };

        b - a > cfg.first_hit_min_rise && *c >= b - cfg.first_hit_rebound_tolerance && *a < cfg.first_hit_baseline_ceiling
    }

    fn clamp(&self, value: f64) -> f64 {
        match self.config.value_limit {
            Some(limit) => value.clamp(-limit, limit),
            None => value,
        }
    }
}
