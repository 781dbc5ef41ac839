//! Cross-pair scaling: the amplitude exponent `β_COM(N)` and the
//! suppression of bundle amplitude relative to independent threads.
//!
//! `β_COM(N)` is minus the least-squares slope of `log10(A_mean)` against
//! `log10(W_coh)` over a window of horizons. The suppression ratio compares
//! a bundle's amplitude with the `1/√N` reduction expected if its threads
//! were independent copies of a single thread at the same `W_coh`.

use std::collections::BTreeMap;

use bundles_core::config::BetaFitConfig;
use bundles_core::pair::PairKey;
use bundles_core::stats::count_as_f64;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AnalysisError;
use crate::summary::PairSummary;

/// Least-squares fit of `log10(A_mean)` against `log10(W_coh)` for one `N`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaFit {
    /// Bundle size the fit covers.
    pub bundle_size: usize,
    /// Effective exponent, `-slope`.
    pub beta: f64,
    /// Fitted slope.
    pub slope: f64,
    /// Fitted intercept.
    pub intercept: f64,
    /// Pairs inside the fit window.
    pub n_points: usize,
}

/// `A(W, N) / (A(W, 1) / √N)` for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressionRatio {
    /// Coherence horizon.
    pub w_coh: f64,
    /// Bundle size.
    pub bundle_size: usize,
    /// Measured amplitude over the independent-thread expectation.
    pub ratio: f64,
}

/// Everything the `fit` step derives from a set of pair summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingReport {
    /// One fit per bundle size, in ascending size.
    pub beta_fits: Vec<BetaFit>,
    /// Ratios for every pair with a single-thread reference.
    pub suppression: Vec<SuppressionRatio>,
}

/// Ordinary least squares of `log10(A)` on `log10(W)`.
///
/// `points` are `(W_coh, A_mean)` pairs; those whose `log10(W_coh)` falls
/// outside the configured window are ignored.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidParameter`] if a usable point has a
/// non-positive amplitude, fewer than two points remain, or every remaining
/// point shares one horizon.
pub fn fit_beta(
    bundle_size: usize,
    points: &[(f64, f64)],
    window: &BetaFitConfig,
) -> Result<BetaFit, AnalysisError> {
    let mut xy = Vec::with_capacity(points.len());
    for &(w_coh, amplitude) in points {
        if w_coh.is_nan() || w_coh <= 0.0 {
            continue;
        }
        let log_w = w_coh.log10();
        if log_w < window.log_wcoh_min || log_w > window.log_wcoh_max {
            continue;
        }
        if !(amplitude.is_finite() && amplitude > 0.0) {
            return Err(AnalysisError::invalid(
                "A_mean",
                format!(
                    "amplitude at W_coh={w_coh}, N={bundle_size} must be positive, \
                     got {amplitude}"
                ),
            ));
        }
        xy.push((log_w, amplitude.log10()));
    }

    if xy.len() < 2 {
        return Err(AnalysisError::invalid(
            "beta_fit",
            format!(
                "N={bundle_size} has {} pair(s) with log10(W_coh) in [{}, {}], need 2",
                xy.len(),
                window.log_wcoh_min,
                window.log_wcoh_max
            ),
        ));
    }

    let n = count_as_f64(xy.len());
    let x_mean = xy.iter().map(|(x, _)| x).sum::<f64>() / n;
    let y_mean = xy.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (sxy, sxx) = xy.iter().fold((0.0_f64, 0.0_f64), |(sxy, sxx), (x, y)| {
        let dx = x - x_mean;
        (dx.mul_add(y - y_mean, sxy), dx.mul_add(dx, sxx))
    });
    if sxx <= 0.0 {
        return Err(AnalysisError::invalid(
            "beta_fit",
            format!("N={bundle_size} has no spread in W_coh inside the fit window"),
        ));
    }

    let slope = sxy / sxx;
    Ok(BetaFit {
        bundle_size,
        beta: -slope,
        slope,
        intercept: slope.mul_add(-x_mean, y_mean),
        n_points: xy.len(),
    })
}

/// Fit `β_COM(N)` for every bundle size present in `summaries`.
///
/// # Errors
///
/// Propagates the first [`fit_beta`] failure.
pub fn beta_by_bundle_size(
    summaries: &[(PairKey, PairSummary)],
    window: &BetaFitConfig,
) -> Result<Vec<BetaFit>, AnalysisError> {
    let mut by_size: BTreeMap<usize, Vec<(f64, f64)>> = BTreeMap::new();
    for (key, summary) in summaries {
        by_size
            .entry(key.bundle_size)
            .or_default()
            .push((key.w_coh, summary.amplitude_mean));
    }
    by_size
        .iter()
        .map(|(&bundle_size, points)| fit_beta(bundle_size, points, window))
        .collect()
}

/// Suppression ratio of every pair that has an `N = 1` pair at the same
/// `W_coh`, ordered by `W_coh` then `N`.
pub fn suppression_ratios(summaries: &[(PairKey, PairSummary)]) -> Vec<SuppressionRatio> {
    let singles: Vec<(f64, f64)> = summaries
        .iter()
        .filter(|(key, _)| key.bundle_size == 1)
        .map(|(key, summary)| (key.w_coh, summary.amplitude_mean))
        .collect();

    let mut ratios: Vec<SuppressionRatio> = summaries
        .iter()
        .filter_map(|(key, summary)| {
            let &(_, single) = singles.iter().find(|(w, _)| w.total_cmp(&key.w_coh).is_eq())?;
            let expected = single / count_as_f64(key.bundle_size).sqrt();
            Some(SuppressionRatio {
                w_coh: key.w_coh,
                bundle_size: key.bundle_size,
                ratio: summary.amplitude_mean / expected,
            })
        })
        .collect();
    ratios.sort_by(|a, b| {
        a.w_coh
            .total_cmp(&b.w_coh)
            .then(a.bundle_size.cmp(&b.bundle_size))
    });
    ratios
}

/// Build the full scaling report.
///
/// # Errors
///
/// Propagates the first [`fit_beta`] failure.
pub fn scaling_report(
    summaries: &[(PairKey, PairSummary)],
    window: &BetaFitConfig,
) -> Result<ScalingReport, AnalysisError> {
    let beta_fits = beta_by_bundle_size(summaries, window)?;
    for fit in &beta_fits {
        info!(
            bundle_size = fit.bundle_size,
            beta = fit.beta,
            n_points = fit.n_points,
            "Amplitude exponent fitted"
        );
    }
    Ok(ScalingReport {
        beta_fits,
        suppression: suppression_ratios(summaries),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn window() -> BetaFitConfig {
        BetaFitConfig {
            log_wcoh_min: 1.0,
            log_wcoh_max: 2.5,
        }
    }

    fn summary(amplitude: f64) -> PairSummary {
        PairSummary {
            amplitude_mean: amplitude,
            amplitude_std: 0.0,
            p0: 1.0,
            p1: 0.0,
            kappa_eff: f64::INFINITY,
            mean_alignment: 1.0,
            std_alignment: 0.0,
            mean_lifetime: 1.0,
            median_lifetime: 1.0,
            frac_survived: 1.0,
            persistence_mean: 1.0,
            persistence_median: 1.0,
        }
    }

    #[test]
    fn power_law_recovers_exponent() {
        // A = 3 W^{-1/2}
        let points: Vec<(f64, f64)> = [10.0, 31.6, 100.0, 316.0]
            .iter()
            .map(|&w: &f64| (w, 3.0 * w.powf(-0.5)))
            .collect();
        let fit = fit_beta(4, &points, &window()).unwrap();
        assert!((fit.beta - 0.5).abs() < 1e-9);
        assert!((fit.intercept - 3.0_f64.log10()).abs() < 1e-9);
        assert_eq!(fit.n_points, 4);
    }

    #[test]
    fn points_outside_window_are_ignored() {
        // The outlier at W = 1000 would wreck the fit if used.
        let points = [(10.0, 1.0), (100.0, 0.1), (1000.0, 50.0)];
        let fit = fit_beta(1, &points, &window()).unwrap();
        assert!((fit.beta - 1.0).abs() < 1e-9);
        assert_eq!(fit.n_points, 2);
    }

    #[test]
    fn too_few_points_is_rejected() {
        assert!(fit_beta(1, &[(20.0, 1.0)], &window()).is_err());
        assert!(fit_beta(1, &[(20.0, 1.0), (20.0, 2.0)], &window()).is_err());
    }

    #[test]
    fn non_positive_amplitude_is_rejected() {
        let result = fit_beta(1, &[(20.0, 1.0), (50.0, 0.0)], &window());
        assert!(matches!(result, Err(AnalysisError::InvalidParameter { .. })));
    }

    #[test]
    fn suppression_is_relative_to_scaled_single_thread() {
        let summaries = vec![
            (PairKey::new(100.0, 4), summary(0.25)),
            (PairKey::new(100.0, 1), summary(1.0)),
            (PairKey::new(50.0, 4), summary(0.5)),
        ];
        let ratios = suppression_ratios(&summaries);
        // W = 50 has no single-thread reference.
        assert_eq!(ratios.len(), 2);
        let four = ratios.iter().find(|r| r.bundle_size == 4).unwrap();
        assert!((four.ratio - 0.5).abs() < 1e-12);
        let one = ratios.iter().find(|r| r.bundle_size == 1).unwrap();
        assert!((one.ratio - 1.0).abs() < 1e-12);
    }

    #[test]
    fn report_fits_each_bundle_size() {
        let mut summaries = Vec::new();
        for w in [10.0_f64, 100.0] {
            summaries.push((PairKey::new(w, 1), summary(w.powf(-0.5))));
            summaries.push((PairKey::new(w, 4), summary(0.5 * w.powf(-0.25))));
        }
        let report = scaling_report(&summaries, &window()).unwrap();
        assert_eq!(report.beta_fits.len(), 2);
        assert_eq!(report.beta_fits[0].bundle_size, 1);
        assert!((report.beta_fits[0].beta - 0.5).abs() < 1e-9);
        assert_eq!(report.beta_fits[1].bundle_size, 4);
        assert!((report.beta_fits[1].beta - 0.25).abs() < 1e-9);
    }
}
