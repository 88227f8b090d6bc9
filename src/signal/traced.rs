//! Per-column traced line positions

use serde::{Deserialize, Serialize};

/// One sample per image column, left to right
///
/// A column where the line was not found is `None`. Absence is never encoded
/// as a numeric row, so it cannot be mistaken for a value downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TracedSignal {
    samples: Vec<Option<f64>>,
}

impl TracedSignal {
    pub fn new(samples: Vec<Option<f64>>) -> Self {
        Self { samples }
    }

    /// Signal of `width` absent columns
    pub fn absent(width: usize) -> Self {
        Self {
            samples: vec![None; width],
        }
    }

    /// Number of columns, equal to the traced image width
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, column: usize) -> Option<f64> {
        self.samples.get(column).copied().flatten()
    }

    pub fn samples(&self) -> &[Option<f64>] {
        &self.samples
    }

    /// `(column, row)` pairs of present columns only
    pub fn present(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.samples
            .iter()
            .enumerate()
            .filter_map(|(column, sample)| sample.map(|y| (column, y)))
    }

    pub fn present_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_some()).count()
    }

    /// Number of absent runs lying between two present columns
    ///
    /// Leading and trailing absence is not counted: a line that starts late
    /// or ends early has no gap.
    pub fn gap_count(&self) -> usize {
        let mut gaps = 0;
        let mut seen_present = false;
        let mut in_gap = false;

        for sample in &self.samples {
            match sample {
                Some(_) => {
                    if in_gap {
                        gaps += 1;
                    }
                    seen_present = true;
                    in_gap = false;
                }
                None => in_gap = seen_present,
            }
        }
        gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let signal = TracedSignal::new(vec![None, Some(10.0), Some(11.0), None, None, Some(9.0), None]);
        assert_eq!(signal.len(), 7);
        assert_eq!(signal.present_count(), 3);
        assert_eq!(signal.gap_count(), 1);
        assert_eq!(signal.get(3), None);
        assert_eq!(signal.get(99), None);
    }

    #[test]
    fn test_absent_signal() {
        let signal = TracedSignal::absent(5);
        assert_eq!(signal.len(), 5);
        assert_eq!(signal.present_count(), 0);
        assert_eq!(signal.gap_count(), 0);
    }

    #[test]
    fn test_present_iterator_skips_absent() {
        let signal = TracedSignal::new(vec![Some(1.0), None, Some(3.0)]);
        let present: Vec<(usize, f64)> = signal.present().collect();
        assert_eq!(present, vec![(0, 1.0), (2, 3.0)]);
    }

    #[test]
    fn test_serializes_absence_as_null() {
        let signal = TracedSignal::new(vec![Some(0.0), None]);
        let json = serde_json::to_string(&signal).unwrap();
        assert_eq!(json, "[0.0,null]");
    }
}
