//! Subcommand implementations.
//!
//! Every command fails fast: the first bad pair aborts the whole batch.

use std::path::Path;

use anyhow::{Context, Result, bail};
use bundles_analysis::{PairSummary, analyse_pair, scaling_report};
use bundles_core::{Execution, PairKey, TopLevelConfig, run_pair};
use bundles_store::{
    OutputLayout, RunMetadata, read_metadata, read_run, read_summary, write_metadata, write_run,
    write_scaling, write_summary,
};
use tracing::info;

/// Load, validate, and simulate a scan, writing metadata and archives.
pub fn run(config_path: &Path, output_override: Option<&Path>, execution: Execution) -> Result<()> {
    let mut config = TopLevelConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    if let Some(dir) = output_override {
        config.output_dir = dir.display().to_string();
    }
    config.validate().context("invalid configuration")?;

    let pairs = config.pairs();
    let layout = OutputLayout::new(&config.output_dir);
    let metadata = RunMetadata::new(config.clone());
    write_metadata(&layout, &metadata).context("failed to write run metadata")?;

    info!(
        run_id = %metadata.run_id,
        model = %config.model_name,
        pairs = pairs.len(),
        n_ensembles = config.ensemble.n_ensembles,
        seed = config.random_seed,
        "Scan starting"
    );

    for key in pairs {
        let run = run_pair(&config, key, execution).with_context(|| format!("pair {key} failed"))?;
        write_run(&layout, &run).with_context(|| format!("failed to archive pair {key}"))?;
    }

    info!(root = %layout.root().display(), "Scan complete");
    Ok(())
}

/// Summaries of every archived pair under `layout`, in scan order.
fn summarise(
    layout: &OutputLayout,
    config: &TopLevelConfig,
) -> Result<Vec<(PairKey, PairSummary)>> {
    let pairs = layout.discover_pairs()?;
    if pairs.is_empty() {
        bail!("no pair archives under {}", layout.root().display());
    }
    pairs
        .into_iter()
        .map(|key| -> Result<(PairKey, PairSummary)> {
            let run = read_run(layout, &key)?;
            let summary = analyse_pair(&run, &config.analysis)
                .with_context(|| format!("analysis of pair {key} failed"))?;
            Ok((key, summary))
        })
        .collect()
}

/// Reduce every archive under `output_dir` and write `summary.json`.
pub fn analyse(output_dir: &Path) -> Result<()> {
    let layout = OutputLayout::new(output_dir);
    let metadata = read_metadata(&layout).context("failed to read run metadata")?;
    let summaries = summarise(&layout, &metadata.config)?;
    write_summary(&layout, &summaries).context("failed to write summary")?;
    Ok(())
}

/// Fit scaling exponents and write `scaling.json`.
///
/// Uses `summary.json` when present, otherwise recomputes the summaries
/// from the archives.
pub fn fit(output_dir: &Path) -> Result<()> {
    let layout = OutputLayout::new(output_dir);
    let metadata = read_metadata(&layout).context("failed to read run metadata")?;

    let summaries = if layout.summary_path().is_file() {
        read_summary(&layout).context("failed to read summary")?
    } else {
        info!("No summary.json found, recomputing from archives");
        summarise(&layout, &metadata.config)?
    };

    let report = scaling_report(&summaries, &metadata.config.analysis.beta_fit)
        .context("scaling fit failed")?;
    write_scaling(&layout, &report).context("failed to write scaling report")?;
    Ok(())
}
