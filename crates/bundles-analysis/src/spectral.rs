//! Welch power-spectral-density estimation and band amplitudes.
//!
//! The estimator splits a series into overlapping segments, tapers each
//! with a window, and averages the one-sided periodograms. Each periodogram
//! is normalised by `fs · Σ w²`. The one-sided bins are *not* doubled, so
//! the power of a real sinusoid is split evenly between the one-sided
//! spectrum and its mirrored half.

use std::f64::consts::TAU;
use std::sync::Arc;

use bundles_core::laws::PsdWindow;
use bundles_core::stats::{count_as_f64, mean};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::AnalysisError;

/// Symmetric Hann window `0.5 − 0.5·cos(2πn / (M − 1))`.
///
/// Windows shorter than two samples are all ones.
pub fn hann_window(len: usize) -> Vec<f64> {
    if len < 2 {
        return vec![1.0; len];
    }
    let denom = count_as_f64(len.saturating_sub(1));
    (0..len)
        .map(|n| 0.5 - 0.5 * (TAU * count_as_f64(n) / denom).cos())
        .collect()
}

/// Taper samples for a configured window kind.
pub fn window_samples(window: PsdWindow, len: usize) -> Vec<f64> {
    match window {
        PsdWindow::Hann => hann_window(len),
    }
}

/// One-sided power spectral density.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Bin frequencies `k · fs / M`, `k = 0..=M/2`.
    pub freqs: Vec<f64>,
    /// Averaged power per bin.
    pub psd: Vec<f64>,
}

impl Spectrum {
    /// Square root of the mean PSD over `[fmin, fmax]`.
    ///
    /// # Errors
    ///
    /// See [`amplitude_from_band`].
    pub fn band_amplitude(&self, fmin: f64, fmax: f64) -> Result<f64, AnalysisError> {
        amplitude_from_band(&self.freqs, &self.psd, fmin, fmax)
    }
}

/// Welch estimator with a fixed segment length, overlap, and window.
///
/// The FFT plan and window are built once and reused for every series, so a
/// single estimator can serve a whole ensemble.
pub struct WelchEstimator {
    segment_length: usize,
    step: usize,
    window: Vec<f64>,
    window_power: f64,
    fft: Arc<dyn Fft<f64>>,
}

impl WelchEstimator {
    /// Plan an estimator.
    ///
    /// The hop between segments is `floor(segment_length · (1 − overlap))`,
    /// falling back to `segment_length` when that is not positive.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidParameter`] if the segment is shorter
    /// than three samples or the window carries no power.
    pub fn new(
        segment_length: usize,
        overlap: f64,
        window: PsdWindow,
    ) -> Result<Self, AnalysisError> {
        if segment_length < 3 {
            return Err(AnalysisError::invalid(
                "segment_length",
                format!("must be at least 3, got {segment_length}"),
            ));
        }
        let window = window_samples(window, segment_length);
        let window_power: f64 = window.iter().map(|w| w * w).sum();
        if window_power <= 0.0 || !window_power.is_finite() {
            return Err(AnalysisError::invalid("window", "window carries no power"));
        }
        let fft = FftPlanner::new().plan_fft_forward(segment_length);

        Ok(Self {
            segment_length,
            step: segment_step(segment_length, overlap),
            window,
            window_power,
            fft,
        })
    }

    /// Samples per segment.
    pub const fn segment_length(&self) -> usize {
        self.segment_length
    }

    /// Hop between consecutive segment starts.
    pub const fn step(&self) -> usize {
        self.step
    }

    /// One-sided frequency axis for sampling rate `fs`.
    pub fn frequencies(&self, fs: f64) -> Vec<f64> {
        let n_bins = (self.segment_length / 2).saturating_add(1);
        let len = count_as_f64(self.segment_length);
        (0..n_bins).map(|k| count_as_f64(k) * fs / len).collect()
    }

    /// Estimate the PSD of `x` sampled at `fs`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidParameter`] if `fs` is not positive
    /// or `x` is shorter than one segment.
    pub fn estimate(&self, x: &[f64], fs: f64) -> Result<Spectrum, AnalysisError> {
        if !(fs.is_finite() && fs > 0.0) {
            return Err(AnalysisError::invalid(
                "fs",
                format!("sampling rate must be positive, got {fs}"),
            ));
        }

        let freqs = self.frequencies(fs);
        let scale = (fs * self.window_power).recip();
        let mut psd = vec![0.0_f64; freqs.len()];
        let mut buffer = vec![Complex::new(0.0_f64, 0.0); self.segment_length];
        let mut n_segments = 0_usize;

        for segment in x.windows(self.segment_length).step_by(self.step) {
            for ((slot, &sample), &w) in buffer.iter_mut().zip(segment).zip(&self.window) {
                *slot = Complex::new(sample * w, 0.0);
            }
            self.fft.process(&mut buffer);
            for (acc, bin) in psd.iter_mut().zip(&buffer) {
                *acc += bin.norm_sqr() * scale;
            }
            n_segments = n_segments.saturating_add(1);
        }

        if n_segments == 0 {
            return Err(AnalysisError::invalid(
                "x",
                format!(
                    "series of length {} is shorter than the segment length {}",
                    x.len(),
                    self.segment_length
                ),
            ));
        }

        let n_segments = count_as_f64(n_segments);
        for p in &mut psd {
            *p /= n_segments;
        }
        Ok(Spectrum { freqs, psd })
    }
}

// `raw` is at least 1 on the cast path and `as` saturates above usize::MAX.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn segment_step(segment_length: usize, overlap: f64) -> usize {
    let raw = (count_as_f64(segment_length) * (1.0 - overlap)).floor();
    if raw.is_nan() || raw < 1.0 {
        return segment_length;
    }
    raw as usize
}

/// Welch PSD of `x` with a Hann window.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidParameter`] if `x` is shorter than
/// `seg_len`, `seg_len < 3`, or `fs` is not positive.
pub fn welch_psd(
    x: &[f64],
    fs: f64,
    seg_len: usize,
    overlap: f64,
) -> Result<Spectrum, AnalysisError> {
    WelchEstimator::new(seg_len, overlap, PsdWindow::Hann)?.estimate(x, fs)
}

/// Square root of the mean PSD over bins with `fmin <= f <= fmax`.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidParameter`] if no bin falls in the band.
pub fn amplitude_from_band(
    freqs: &[f64],
    psd: &[f64],
    fmin: f64,
    fmax: f64,
) -> Result<f64, AnalysisError> {
    let band: Vec<f64> = freqs
        .iter()
        .zip(psd)
        .filter(|&(&f, _)| f >= fmin && f <= fmax)
        .map(|(_, &p)| p)
        .collect();
    if band.is_empty() {
        return Err(AnalysisError::invalid(
            "amplitude_fit",
            format!("no frequencies in band [{fmin}, {fmax}]"),
        ));
    }
    Ok(mean(&band).sqrt())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::f64::consts::SQRT_2;

    use super::*;

    const SEG: usize = 256;

    fn sinusoid(amplitude: f64, f0: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| amplitude * (TAU * f0 * count_as_f64(n)).sin())
            .collect()
    }

    #[test]
    fn hann_window_is_symmetric_and_zero_at_edges() {
        let w = hann_window(9);
        assert_eq!(w.len(), 9);
        assert!(w[0].abs() < 1e-15);
        assert!(w[8].abs() < 1e-15);
        assert!((w[4] - 1.0).abs() < 1e-15);
        assert!(w.iter().zip(w.iter().rev()).all(|(a, b)| (a - b).abs() < 1e-15));
    }

    #[test]
    fn frequency_axis_is_one_sided() {
        let freqs = welch_psd(&vec![0.0; 1024], 1.0, SEG, 0.5).unwrap().freqs;
        assert_eq!(freqs.len(), SEG / 2 + 1);
        assert!(freqs[0].abs() < f64::EPSILON);
        assert!((freqs[SEG / 2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn hop_follows_overlap() {
        let step = |overlap| WelchEstimator::new(SEG, overlap, PsdWindow::Hann).unwrap().step();
        assert_eq!(step(0.5), 128);
        assert_eq!(step(0.0), 256);
        assert_eq!(step(0.999), SEG);
    }

    #[test]
    fn sinusoid_power_matches_rms() {
        let amplitude = 2.0;
        let f0 = 0.125;
        let x = sinusoid(amplitude, f0, 1024);
        let spectrum = welch_psd(&x, 1.0, SEG, 0.5).unwrap();
        let df = 1.0 / count_as_f64(SEG);
        let rms = amplitude / SQRT_2;

        // Doubling the one-sided total recovers the full signal power.
        let total: f64 = spectrum.psd.iter().sum::<f64>() * df;
        let recovered = (2.0 * total).sqrt();
        assert!((recovered - rms).abs() / rms < 0.05, "{recovered} vs {rms}");

        // Five bins around f0 hold the whole Hann main lobe.
        let half_band = 2.5 * df;
        let band = spectrum.band_amplitude(f0 - half_band, f0 + half_band).unwrap();
        let band_rms = band * (10.0 * df).sqrt();
        assert!((band_rms - rms).abs() / rms < 0.05, "{band_rms} vs {rms}");
    }

    #[test]
    fn peak_sits_at_signal_frequency() {
        let x = sinusoid(1.0, 0.0625, 2048);
        let spectrum = welch_psd(&x, 1.0, SEG, 0.5).unwrap();
        let (peak, _) = spectrum
            .freqs
            .iter()
            .zip(&spectrum.psd)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert!((peak - 0.0625).abs() < 1e-12);
    }

    #[test]
    fn zero_series_has_zero_amplitude() {
        let spectrum = welch_psd(&vec![0.0; 600], 1.0, SEG, 0.5).unwrap();
        let amplitude = spectrum.band_amplitude(0.01, 0.1).unwrap();
        assert!(amplitude.abs() < f64::EPSILON);
    }

    #[test]
    fn short_series_is_rejected() {
        let err = welch_psd(&[1.0; 100], 1.0, SEG, 0.5).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InvalidParameter { ref parameter, .. } if parameter == "x"
        ));
    }

    #[test]
    fn series_of_exactly_one_segment_is_accepted() {
        assert!(welch_psd(&[1.0; SEG], 1.0, SEG, 0.5).is_ok());
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert!(welch_psd(&[1.0; 10], 1.0, 2, 0.5).is_err());
        assert!(welch_psd(&[1.0; 1024], 0.0, SEG, 0.5).is_err());
    }

    #[test]
    fn empty_band_is_rejected() {
        let freqs = [0.0, 0.25, 0.5];
        let psd = [1.0, 2.0, 3.0];
        assert!(amplitude_from_band(&freqs, &psd, 0.3, 0.4).is_err());
    }

    #[test]
    fn band_edges_are_inclusive() {
        let freqs = [0.0, 0.25, 0.5];
        let psd = [1.0, 4.0, 16.0];
        let amplitude = amplitude_from_band(&freqs, &psd, 0.25, 0.5).unwrap();
        assert!((amplitude - 10.0_f64.sqrt()).abs() < 1e-12);
    }
}
