//! Round-trip tests for the on-disk layout using temporary directories.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::fs;

use bundles_analysis::{analyse_pair, scaling_report};
use bundles_core::{Execution, PairKey, TopLevelConfig, run_pair};
use bundles_store::{
    OutputLayout, RunMetadata, StoreError, read_metadata, read_run, read_scaling, read_summary,
    write_metadata, write_run, write_scaling, write_summary,
};

fn small_config(output_dir: &str) -> TopLevelConfig {
    let yaml = format!(
        r"
output_dir: {output_dir}
random_seed: 7
wcoh_grid: [10, 12.5, 100]
bundle_sizes: [1, 3]
ensemble:
  n_ensembles: 3
  steps_per_wcoh: 20
kernel:
  type: soft_rudder_bundle
bundle_coupling:
  mode: shared_bias
  coupling_strength: 0.3
phase_dynamics:
  enabled: true
  params:
    wcoh_scaling: sqrt_inverse
analysis:
  psd:
    segment_length: 64
  beta_fit:
    log_wcoh_min: 1.0
    log_wcoh_max: 2.0
"
    );
    let cfg = TopLevelConfig::parse(&yaml).unwrap();
    cfg.validate().unwrap();
    cfg
}

#[test]
fn archives_round_trip_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = small_config(&dir.path().display().to_string());
    let layout = OutputLayout::new(&cfg.output_dir);

    write_metadata(&layout, &RunMetadata::new(cfg.clone())).unwrap();
    let mut written = Vec::new();
    for key in cfg.pairs() {
        let run = run_pair(&cfg, key, Execution::Parallel).unwrap();
        write_run(&layout, &run).unwrap();
        written.push(run);
    }

    let metadata = read_metadata(&layout).unwrap();
    assert_eq!(metadata.config, cfg);
    assert_eq!(metadata.run_id.into_inner().get_version_num(), 7);

    let discovered = layout.discover_pairs().unwrap();
    assert_eq!(discovered.len(), 6);
    assert!(layout.pair_dir(&PairKey::new(12.5, 3)).is_dir());

    for run in &written {
        let back = read_run(&layout, &run.key).unwrap();
        assert_eq!(&back, run);
        assert!(back.phase_coherence.is_some());
    }
}

#[test]
fn discovery_skips_foreign_directories() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = small_config(&dir.path().display().to_string());
    let layout = OutputLayout::new(dir.path());

    let key = PairKey::new(10.0, 1);
    write_run(&layout, &run_pair(&cfg, key, Execution::Sequential).unwrap()).unwrap();
    fs::create_dir_all(dir.path().join("figures")).unwrap();
    fs::create_dir_all(dir.path().join("W20_N2")).unwrap();
    fs::write(dir.path().join("notes.txt"), "scratch").unwrap();

    let pairs = layout.discover_pairs().unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].dir_name(), "W10_N1");
}

#[test]
fn missing_pair_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    let err = read_run(&layout, &PairKey::new(50.0, 2)).unwrap_err();
    assert!(matches!(err, StoreError::MissingPair { ref pair, .. } if pair == "W50_N2"));
}

#[test]
fn summary_and_scaling_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = small_config(&dir.path().display().to_string());
    let layout = OutputLayout::new(dir.path());

    let summaries: Vec<_> = cfg
        .pairs()
        .into_iter()
        .map(|key| {
            let run = run_pair(&cfg, key, Execution::Parallel).unwrap();
            (key, analyse_pair(&run, &cfg.analysis).unwrap())
        })
        .collect();
    write_summary(&layout, &summaries).unwrap();

    let raw = fs::read_to_string(layout.summary_path()).unwrap();
    assert!(raw.contains("\"W12.5_N3\""));
    assert!(raw.contains("\"W10.0_N1\""));
    assert!(raw.contains("\"A_mean\""));

    let back = read_summary(&layout).unwrap();
    assert_eq!(back.len(), summaries.len());
    for ((key_a, a), (key_b, b)) in back.iter().zip(&summaries) {
        assert_eq!(key_a.dir_name(), key_b.dir_name());
        assert_eq!(a.amplitude_mean.to_bits(), b.amplitude_mean.to_bits());
        assert_eq!(a.kappa_eff.is_infinite(), b.kappa_eff.is_infinite());
        assert_eq!(a.p0.to_bits(), b.p0.to_bits());
    }

    let report = scaling_report(&back, &cfg.analysis.beta_fit).unwrap();
    write_scaling(&layout, &report).unwrap();
    assert_eq!(read_scaling(&layout).unwrap(), report);
}

#[test]
fn unreadable_metadata_is_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    fs::write(layout.metadata_path(), "{ not json").unwrap();
    assert!(matches!(read_metadata(&layout), Err(StoreError::Json { .. })));
}
