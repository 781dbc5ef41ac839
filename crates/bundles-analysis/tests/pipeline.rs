//! End-to-end tests: simulate a small scan, reduce each pair to a summary,
//! and fit the scaling exponents.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use bundles_analysis::{PairSummary, analyse_pair, scaling_report};
use bundles_core::laws::CouplingMode;
use bundles_core::{Execution, PairKey, TopLevelConfig, run_pair};

const CONFIG: &str = r"
model_name: pipeline_test
random_seed: 2024
wcoh_grid: [10.0, 31.6, 100.0]
bundle_sizes: [1, 4]
ensemble:
  n_ensembles: 4
  steps_per_wcoh: 20
analysis:
  psd:
    segment_length: 64
    overlap: 0.5
  amplitude_fit:
    freq_min: 0.01
    freq_max: 0.1
  lifetime:
    f_min: 0.6
    evap_window: 5
";

fn summaries(cfg: &TopLevelConfig) -> Vec<(PairKey, PairSummary)> {
    cfg.pairs()
        .into_iter()
        .map(|key| {
            let run = run_pair(cfg, key, Execution::Parallel).unwrap();
            (key, analyse_pair(&run, &cfg.analysis).unwrap())
        })
        .collect()
}

#[test]
fn scan_reduces_to_sane_summaries() {
    let cfg = TopLevelConfig::parse(CONFIG).unwrap();
    cfg.validate().unwrap();

    let all = summaries(&cfg);
    assert_eq!(all.len(), 6);

    for (key, summary) in &all {
        assert!(summary.amplitude_mean > 0.0, "{key}");
        assert!(summary.amplitude_std >= 0.0);
        assert!((0.0..=1.0).contains(&summary.p0));
        assert!((0.0..=1.0).contains(&summary.p1));
        assert!(summary.p0 + summary.p1 <= 1.0 + 1e-12);
        assert!((0.0..=1.0).contains(&summary.mean_alignment));
        assert!((0.0..=1.0).contains(&summary.frac_survived));
        assert!(summary.persistence_mean >= 1.0);
    }

    // A single thread never loses alignment and never shows two flips.
    for (key, summary) in all.iter().filter(|(k, _)| k.bundle_size == 1) {
        assert!((summary.mean_alignment - 1.0).abs() < 1e-12, "{key}");
        assert!((summary.frac_survived - 1.0).abs() < 1e-12);
        assert!((summary.p0 + summary.p1 - 1.0).abs() < 1e-12);
    }
}

#[test]
fn larger_horizons_flip_less() {
    let cfg = TopLevelConfig::parse(CONFIG).unwrap();
    let all = summaries(&cfg);
    let p0 = |w: f64| {
        all.iter()
            .find(|(k, _)| k.bundle_size == 4 && (k.w_coh - w).abs() < 1e-9)
            .map(|(_, s)| s.p0)
            .unwrap()
    };
    // q = 2 / W, so P0 = (1 - q)^4 rises from 0.41 to 0.92.
    assert!(p0(10.0) < p0(100.0));
    assert!((p0(10.0) - 0.8_f64.powi(4)).abs() < 0.08);
}

#[test]
fn scaling_report_covers_every_bundle_size() {
    let cfg = TopLevelConfig::parse(CONFIG).unwrap();
    let all = summaries(&cfg);
    let report = scaling_report(&all, &cfg.analysis.beta_fit).unwrap();

    assert_eq!(report.beta_fits.len(), 2);
    assert!(report.beta_fits.iter().all(|f| f.beta.is_finite()));
    assert!(report.beta_fits.iter().all(|f| f.n_points == 3));

    // Every pair has an N = 1 reference, and N = 1 is its own reference.
    assert_eq!(report.suppression.len(), 6);
    for ratio in report.suppression.iter().filter(|r| r.bundle_size == 1) {
        assert!((ratio.ratio - 1.0).abs() < 1e-12);
    }
}

#[test]
fn coupling_raises_alignment() {
    let mut independent = TopLevelConfig::parse(CONFIG).unwrap();
    independent.ensemble.n_ensembles = 8;
    let mut locked = independent.clone();
    locked.bundle_coupling.mode = CouplingMode::SharedBias;
    locked.bundle_coupling.coupling_strength = 1.0;

    let key = PairKey::new(10.0, 4);
    let mean_sv = |cfg: &TopLevelConfig| {
        let run = run_pair(cfg, key, Execution::Sequential).unwrap();
        analyse_pair(&run, &cfg.analysis).unwrap().mean_alignment
    };
    assert!(mean_sv(&locked) > mean_sv(&independent));
}

#[test]
fn analysis_is_reproducible() {
    let cfg = TopLevelConfig::parse(CONFIG).unwrap();
    let first = summaries(&cfg);
    let second = summaries(&cfg);
    let amplitudes = |s: &[(PairKey, PairSummary)]| {
        s.iter().map(|(_, x)| x.amplitude_mean.to_bits()).collect::<Vec<_>>()
    };
    assert_eq!(amplitudes(&first), amplitudes(&second));
}
