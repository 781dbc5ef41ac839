//! Evaporation detection on an alignment series.
//!
//! A bundle "evaporates" once its alignment has stayed below `f_min` for
//! `evap_window` consecutive steps. The lifetime is the step index at which
//! that run completes; a bundle that never evaporates lives for the whole
//! series.

use serde::{Deserialize, Serialize};

/// Lifetime verdict for one ensemble member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    /// Evaporation step, or the series length when the bundle survived.
    pub steps: usize,
    /// Whether the bundle never evaporated.
    pub survived: bool,
}

/// Scan `alignment` for the first completed below-threshold run.
pub fn detect(alignment: &[f64], f_min: f64, evap_window: usize) -> Lifetime {
    let mut below = 0_usize;
    for (t, &s_v) in alignment.iter().enumerate() {
        if s_v < f_min {
            below = below.saturating_add(1);
            if below >= evap_window {
                return Lifetime {
                    steps: t,
                    survived: false,
                };
            }
        } else {
            below = 0;
        }
    }
    Lifetime {
        steps: alignment.len(),
        survived: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaporates_on_third_consecutive_low_sample() {
        let series = [0.9, 0.9, 0.5, 0.5, 0.5, 0.9];
        assert_eq!(
            detect(&series, 0.6, 3),
            Lifetime {
                steps: 4,
                survived: false
            }
        );
    }

    #[test]
    fn interrupted_runs_reset_the_counter() {
        let series = [0.5, 0.5, 0.9, 0.5, 0.5, 0.9, 0.5];
        assert_eq!(
            detect(&series, 0.6, 3),
            Lifetime {
                steps: 7,
                survived: true
            }
        );
    }

    #[test]
    fn threshold_is_strict() {
        let series = [0.6, 0.6, 0.6];
        assert!(detect(&series, 0.6, 1).survived);
    }

    #[test]
    fn window_of_one_fires_on_first_low_sample() {
        let series = [1.0, 1.0, 0.0, 1.0];
        assert_eq!(detect(&series, 0.6, 1).steps, 2);
    }

    #[test]
    fn empty_series_survives_with_zero_lifetime() {
        assert_eq!(
            detect(&[], 0.6, 3),
            Lifetime {
                steps: 0,
                survived: true
            }
        );
    }
}
