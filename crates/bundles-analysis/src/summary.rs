//! Reduction of one pair's raw arrays to a flat summary record.
//!
//! Non-finite values serialize as `null`. On the way back in, a `null`
//! `kappa_eff` becomes `+∞` and any other `null` becomes NaN.

use bundles_core::config::AnalysisConfig;
use bundles_core::ensemble::RunResult;
use bundles_core::stats::{count_as_f64, mean, median, std_dev};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AnalysisError;
use crate::flips::FlipDistribution;
use crate::spectral::WelchEstimator;

/// Sampling rate of every acceleration series; only band ratios matter.
pub const SAMPLE_RATE: f64 = 1.0;

/// Summary quantities for one `(W_coh, N)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSummary {
    /// Mean band amplitude over members.
    #[serde(
        rename = "A_mean",
        serialize_with = "nullable::serialize",
        deserialize_with = "nullable::nan"
    )]
    pub amplitude_mean: f64,
    /// Population standard deviation of the band amplitude.
    #[serde(
        rename = "A_std",
        serialize_with = "nullable::serialize",
        deserialize_with = "nullable::nan"
    )]
    pub amplitude_std: f64,
    /// Probability of zero flips in a step.
    #[serde(rename = "P0")]
    pub p0: f64,
    /// Probability of exactly one flip in a step.
    #[serde(rename = "P1")]
    pub p1: f64,
    /// Effective decay rate; `+∞` when single flips never occur.
    #[serde(serialize_with = "nullable::serialize", deserialize_with = "nullable::infinity")]
    pub kappa_eff: f64,
    /// Mean alignment over all members and steps.
    #[serde(
        rename = "mean_Sv",
        serialize_with = "nullable::serialize",
        deserialize_with = "nullable::nan"
    )]
    pub mean_alignment: f64,
    /// Standard deviation of alignment over all members and steps.
    #[serde(
        rename = "std_Sv",
        serialize_with = "nullable::serialize",
        deserialize_with = "nullable::nan"
    )]
    pub std_alignment: f64,
    /// Mean lifetime in steps.
    #[serde(serialize_with = "nullable::serialize", deserialize_with = "nullable::nan")]
    pub mean_lifetime: f64,
    /// Median lifetime in steps.
    #[serde(serialize_with = "nullable::serialize", deserialize_with = "nullable::nan")]
    pub median_lifetime: f64,
    /// Fraction of members that never evaporated.
    #[serde(serialize_with = "nullable::serialize", deserialize_with = "nullable::nan")]
    pub frac_survived: f64,
    /// Mean of the per-member mean persistence lengths.
    #[serde(
        rename = "L_persist_mean",
        serialize_with = "nullable::serialize",
        deserialize_with = "nullable::nan"
    )]
    pub persistence_mean: f64,
    /// Median of the per-member mean persistence lengths.
    #[serde(
        rename = "L_persist_median",
        serialize_with = "nullable::serialize",
        deserialize_with = "nullable::nan"
    )]
    pub persistence_median: f64,
}

/// Reduce one pair's arrays to its summary record.
///
/// The band amplitude is computed per member from its acceleration series
/// and then averaged. Flip statistics pool every member-step.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidParameter`] if an acceleration series is
/// shorter than the PSD segment or the amplitude band holds no bin.
pub fn analyse_pair(run: &RunResult, cfg: &AnalysisConfig) -> Result<PairSummary, AnalysisError> {
    let psd = &cfg.psd;
    let band = &cfg.amplitude_fit;
    let estimator = WelchEstimator::new(psd.segment_length, psd.overlap, psd.window)?;

    let amplitudes = run
        .acceleration
        .iter()
        .map(|series| {
            estimator
                .estimate(series, SAMPLE_RATE)?
                .band_amplitude(band.freq_min, band.freq_max)
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let flips = FlipDistribution::from_series(&run.flips);
    let alignment: Vec<f64> = run.alignment.iter().flatten().copied().collect();
    let lifetimes: Vec<f64> = run.lifetimes.iter().copied().map(count_as_f64).collect();
    let survivors = run.survived.iter().filter(|&&s| s).count();

    let summary = PairSummary {
        amplitude_mean: mean(&amplitudes),
        amplitude_std: std_dev(&amplitudes),
        p0: flips.probability(0),
        p1: flips.probability(1),
        kappa_eff: flips.kappa_eff(),
        mean_alignment: mean(&alignment),
        std_alignment: std_dev(&alignment),
        mean_lifetime: mean(&lifetimes),
        median_lifetime: median(&lifetimes),
        frac_survived: count_as_f64(survivors) / count_as_f64(run.survived.len()),
        persistence_mean: mean(&run.persistence_mean),
        persistence_median: median(&run.persistence_mean),
    };

    info!(
        w_coh = run.key.w_coh,
        bundle_size = run.key.bundle_size,
        a_mean = summary.amplitude_mean,
        kappa_eff = summary.kappa_eff,
        frac_survived = summary.frac_survived,
        "Pair analysed"
    );
    Ok(summary)
}

mod nullable {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }

    pub fn infinity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bundles_core::pair::PairKey;

    use super::*;

    fn analysis_config(segment_length: usize) -> AnalysisConfig {
        let mut cfg = AnalysisConfig::default();
        cfg.psd.segment_length = segment_length;
        cfg.amplitude_fit.freq_min = 0.0;
        cfg.amplitude_fit.freq_max = 0.5;
        cfg
    }

    fn hand_built_run() -> RunResult {
        RunResult {
            key: PairKey::new(4.0, 2),
            steps: 10,
            acceleration: vec![vec![0.0; 8], vec![0.0; 8]],
            flips: vec![vec![0, 0, 0, 0, 1, 0, 0, 0, 1, 0], vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 2]],
            alignment: vec![vec![1.0; 10], vec![0.0; 10]],
            lifetimes: vec![10, 4],
            survived: vec![true, false],
            persistence_mean: vec![2.0, 4.0],
            persistence_median: vec![2.0, 3.0],
            phase_coherence: None,
        }
    }

    #[test]
    fn hand_built_run_reduces_as_expected() {
        let summary = analyse_pair(&hand_built_run(), &analysis_config(4)).unwrap();

        assert!(summary.amplitude_mean.abs() < f64::EPSILON);
        assert!(summary.amplitude_std.abs() < f64::EPSILON);
        assert!((summary.p0 - 0.85).abs() < 1e-12);
        assert!((summary.p1 - 0.1).abs() < 1e-12);
        assert!((summary.kappa_eff - 8.5_f64.ln()).abs() < 1e-9);
        assert!((summary.mean_alignment - 0.5).abs() < 1e-12);
        assert!((summary.std_alignment - 0.5).abs() < 1e-12);
        assert!((summary.mean_lifetime - 7.0).abs() < 1e-12);
        assert!((summary.median_lifetime - 7.0).abs() < 1e-12);
        assert!((summary.frac_survived - 0.5).abs() < 1e-12);
        assert!((summary.persistence_mean - 3.0).abs() < 1e-12);
        assert!((summary.persistence_median - 3.0).abs() < 1e-12);
    }

    #[test]
    fn short_acceleration_is_rejected() {
        let result = analyse_pair(&hand_built_run(), &analysis_config(64));
        assert!(matches!(result, Err(AnalysisError::InvalidParameter { .. })));
    }

    #[test]
    fn infinite_kappa_round_trips_through_null() {
        let mut run = hand_built_run();
        run.flips = vec![vec![0; 10], vec![0; 10]];
        let summary = analyse_pair(&run, &analysis_config(4)).unwrap();
        assert!(summary.kappa_eff.is_infinite());

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"kappa_eff\":null"));
        assert!(json.contains("\"A_mean\""));
        assert!(json.contains("\"L_persist_median\""));

        let back: PairSummary = serde_json::from_str(&json).unwrap();
        assert!(back.kappa_eff.is_infinite() && back.kappa_eff > 0.0);
    }

    #[test]
    fn null_amplitude_reads_back_as_nan() {
        let json = r#"{"A_mean":null,"A_std":0.0,"P0":1.0,"P1":0.0,"kappa_eff":null,
            "mean_Sv":1.0,"std_Sv":0.0,"mean_lifetime":5.0,"median_lifetime":5.0,
            "frac_survived":1.0,"L_persist_mean":5.0,"L_persist_median":5.0}"#;
        let parsed: PairSummary = serde_json::from_str(json).unwrap();
        assert!(parsed.amplitude_mean.is_nan());
        assert!(parsed.kappa_eff.is_infinite());
    }
}
