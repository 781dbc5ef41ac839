//! Descriptive statistics shared by the driver and the analyzers.
//!
//! Conventions follow the summary records: standard deviation is the
//! population form, the median of an even-length sample averages the two
//! middle values, and every statistic of an empty sample is NaN.

/// Convert a count to `f64`.
///
/// Counts in this workspace are step and member tallies, far below 2^52.
#[allow(clippy::cast_precision_loss)]
pub const fn count_as_f64(count: usize) -> f64 {
    count as f64
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / count_as_f64(values.len())
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let centre = mean(values);
    let variance = values
        .iter()
        .map(|v| (v - centre).powi(2))
        .sum::<f64>()
        / count_as_f64(values.len());
    variance.sqrt()
}

/// Median.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted.get(mid).copied().unwrap_or(f64::NAN)
    } else {
        match (sorted.get(mid.wrapping_sub(1)), sorted.get(mid)) {
            (Some(lo), Some(hi)) => (lo + hi) / 2.0,
            _ => f64::NAN,
        }
    }
}
