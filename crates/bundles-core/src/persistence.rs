//! Persistence lengths: runs of constant centre-of-mass direction sign.
//!
//! A sign of `0` (exactly balanced bundle) closes any open run without
//! starting a new one. A change between `+1` and `-1` closes the current run
//! and opens a new run of length 1.

use serde::{Deserialize, Serialize};

use crate::stats::{count_as_f64, mean, median};

/// Mean and median run length of one member, in steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Persistence {
    /// Mean run length.
    pub mean: f64,
    /// Median run length.
    pub median: f64,
}

/// Lengths of every run in `signs`, in order of completion.
pub fn run_lengths(signs: &[i8]) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut current = 0_i8;
    let mut length = 0_usize;

    for &sign in signs {
        if sign == 0 {
            if length > 0 {
                runs.push(length);
            }
            length = 0;
            current = 0;
        } else if sign == current {
            length = length.saturating_add(1);
        } else {
            if length > 0 {
                runs.push(length);
            }
            current = sign;
            length = 1;
        }
    }
    if length > 0 {
        runs.push(length);
    }
    runs
}

/// Mean and median run length; `(0.0, 0.0)` when no run was recorded.
pub fn analyze(signs: &[i8]) -> Persistence {
    let runs: Vec<f64> = run_lengths(signs).into_iter().map(count_as_f64).collect();
    if runs.is_empty() {
        return Persistence {
            mean: 0.0,
            median: 0.0,
        };
    }
    Persistence {
        mean: mean(&runs),
        median: median(&runs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_breaks_without_extending() {
        let signs = [1, 1, 1, 0, -1, -1, 1, 1];
        assert_eq!(run_lengths(&signs), vec![3, 2, 2]);

        let stats = analyze(&signs);
        assert!((stats.mean - 7.0 / 3.0).abs() < 1e-12);
        assert!((stats.median - 2.0).abs() < 1e-12);
    }

    #[test]
    fn no_runs_yields_zeros() {
        let stats = analyze(&[0, 0, 0]);
        assert!(stats.mean.abs() < f64::EPSILON);
        assert!(stats.median.abs() < f64::EPSILON);
        assert_eq!(analyze(&[]), stats);
    }

    #[test]
    fn single_unbroken_run() {
        assert_eq!(run_lengths(&[-1; 5]), vec![5]);
    }

    #[test]
    fn alternating_signs_give_unit_runs() {
        let stats = analyze(&[1, -1, 1, -1]);
        assert!((stats.mean - 1.0).abs() < 1e-12);
        assert!((stats.median - 1.0).abs() < 1e-12);
    }
}
