//! `summary.json` and `scaling.json`.
//!
//! The summary table is a JSON object keyed by `W<W:?>_N<N>` (for example
//! `W20.0_N4`); each value is the flat record of [`PairSummary`].

use std::collections::BTreeMap;

use bundles_analysis::scaling::ScalingReport;
use bundles_analysis::summary::PairSummary;
use bundles_core::pair::PairKey;
use tracing::info;

use crate::archive::{read_json, write_json};
use crate::error::StoreError;
use crate::layout::OutputLayout;

/// Write `summary.json`.
///
/// # Errors
///
/// Returns [`StoreError::Io`] or [`StoreError::Json`] on write failure.
pub fn write_summary(
    layout: &OutputLayout,
    summaries: &[(PairKey, PairSummary)],
) -> Result<(), StoreError> {
    let table: BTreeMap<String, &PairSummary> = summaries
        .iter()
        .map(|(key, summary)| (key.summary_key(), summary))
        .collect();
    let path = layout.summary_path();
    write_json(&path, &table, true)?;
    info!(path = %path.display(), pairs = table.len(), "Summary written");
    Ok(())
}

/// Read `summary.json`, sorted by `W_coh` then `N`.
///
/// # Errors
///
/// Returns [`StoreError::InvalidPairName`] for a key that is not a pair,
/// or [`StoreError::Io`] / [`StoreError::Json`] on read failure.
pub fn read_summary(layout: &OutputLayout) -> Result<Vec<(PairKey, PairSummary)>, StoreError> {
    let table: BTreeMap<String, PairSummary> = read_json(&layout.summary_path())?;
    let mut summaries = table
        .into_iter()
        .map(|(name, summary)| {
            PairKey::parse(&name)
                .ok()
                .map(|key| (key, summary))
                .ok_or(StoreError::InvalidPairName(name))
        })
        .collect::<Result<Vec<_>, _>>()?;
    summaries.sort_by(|(a, _), (b, _)| a.cmp_scan_order(b));
    Ok(summaries)
}

/// Write `scaling.json`.
///
/// # Errors
///
/// Returns [`StoreError::Io`] or [`StoreError::Json`] on write failure.
pub fn write_scaling(layout: &OutputLayout, report: &ScalingReport) -> Result<(), StoreError> {
    let path = layout.scaling_path();
    write_json(&path, report, true)?;
    info!(path = %path.display(), fits = report.beta_fits.len(), "Scaling report written");
    Ok(())
}

/// Read `scaling.json`.
///
/// # Errors
///
/// Returns [`StoreError::Io`] or [`StoreError::Json`] on read failure.
pub fn read_scaling(layout: &OutputLayout) -> Result<ScalingReport, StoreError> {
    read_json(&layout.scaling_path())
}
