//! Configuration loading and typed config structures for bundle scans.
//!
//! A scan is described by one YAML file. This module defines strongly-typed
//! structs that mirror the YAML structure, a loader, and a single
//! [`TopLevelConfig::validate`] pass that runs before any simulation so that
//! bad values surface as [`CoreError::InvalidParameter`] up front.
//!
//! Law selectors (`kernel.type`, `slip_law.form`, `bundle_coupling.mode`,
//! `phase_dynamics.law`, `wcoh_scaling`, `psd.window`) are closed enums from
//! [`crate::laws`]. Their tags are resolved before the typed structs are
//! built, so an unknown tag is an [`CoreError::InvalidParameter`] naming the
//! field rather than a YAML error.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_yml::Value;

use crate::error::CoreError;
use crate::laws::{CouplingMode, KernelKind, PhaseLaw, PsdWindow, SlipForm, WcohScaling};
use crate::pair::PairKey;

/// Top-level scan configuration.
///
/// Every section has defaults matching the reference scan, so a file only
/// needs to name the grids it sweeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopLevelConfig {
    /// Human-readable model name recorded in run metadata.
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Root directory for archives, metadata, and summaries.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Base seed from which every member sub-stream is derived.
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,

    /// Coherence horizons to scan (outer loop).
    #[serde(default, deserialize_with = "one_or_many")]
    pub wcoh_grid: Vec<f64>,

    /// Bundle sizes to scan (inner loop).
    #[serde(default, deserialize_with = "one_or_many")]
    pub bundle_sizes: Vec<usize>,

    /// Ensemble size and run length.
    #[serde(default)]
    pub ensemble: EnsembleConfig,

    /// Single-thread kernel and slip law.
    #[serde(default)]
    pub kernel: KernelConfig,

    /// Mean-field coupling between threads of one bundle.
    #[serde(default)]
    pub bundle_coupling: BundleCouplingConfig,

    /// Optional per-thread phase accumulation.
    #[serde(default)]
    pub phase_dynamics: PhaseDynamicsConfig,

    /// Post-processing parameters.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Default for TopLevelConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            output_dir: default_output_dir(),
            random_seed: default_random_seed(),
            wcoh_grid: Vec::new(),
            bundle_sizes: Vec::new(),
            ensemble: EnsembleConfig::default(),
            kernel: KernelConfig::default(),
            bundle_coupling: BundleCouplingConfig::default(),
            phase_dynamics: PhaseDynamicsConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl TopLevelConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the file cannot be read, or any error
    /// from [`TopLevelConfig::parse`].
    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidParameter`] if a law selector names an
    /// unknown tag, or [`CoreError::Yaml`] if the string is not valid YAML or
    /// does not match the config structure.
    pub fn parse(yaml: &str) -> Result<Self, CoreError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let document: Value = serde_yml::from_str(yaml)?;
        if document.is_null() {
            return Ok(Self::default());
        }
        resolve_law_tags(&document)?;
        let config: Self = serde_yml::from_value(document)?;
        Ok(config)
    }

    /// Check every value the simulation and analysis depend on.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidParameter`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.wcoh_grid.is_empty() {
            return Err(CoreError::invalid("wcoh_grid", "must list at least one W_coh"));
        }
        if self.bundle_sizes.is_empty() {
            return Err(CoreError::invalid("bundle_sizes", "must list at least one bundle size"));
        }
        for &w_coh in &self.wcoh_grid {
            if !(w_coh.is_finite() && w_coh > 0.0) {
                return Err(CoreError::invalid(
                    "wcoh_grid",
                    format!("W_coh must be positive and finite, got {w_coh}"),
                ));
            }
            self.ensemble.steps_for(w_coh)?;
        }
        if self.bundle_sizes.contains(&0) {
            return Err(CoreError::invalid("bundle_sizes", "bundle size must be at least 1"));
        }
        if self.ensemble.n_ensembles == 0 {
            return Err(CoreError::invalid("ensemble.n_ensembles", "must be at least 1"));
        }
        self.kernel.validate()?;
        self.bundle_coupling.validate()?;
        self.phase_dynamics.validate()?;
        self.analysis.validate()
    }

    /// Every `(W_coh, N)` pair of the scan, W outer and N inner.
    pub fn pairs(&self) -> Vec<PairKey> {
        self.wcoh_grid
            .iter()
            .flat_map(|&w_coh| {
                self.bundle_sizes
                    .iter()
                    .map(move |&bundle_size| PairKey::new(w_coh, bundle_size))
            })
            .collect()
    }
}

/// Ensemble size and run length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Independent bundles simulated per pair.
    #[serde(default = "default_n_ensembles")]
    pub n_ensembles: usize,

    /// Steps per unit of coherence horizon.
    #[serde(default = "default_steps_per_wcoh")]
    pub steps_per_wcoh: u32,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            n_ensembles: default_n_ensembles(),
            steps_per_wcoh: default_steps_per_wcoh(),
        }
    }
}

impl EnsembleConfig {
    /// Step count for one pair: `floor(steps_per_wcoh · W_coh)`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidParameter`] when the count is below 2,
    /// since acceleration needs two differences.
    pub fn steps_for(&self, w_coh: f64) -> Result<usize, CoreError> {
        let raw = (f64::from(self.steps_per_wcoh) * w_coh).floor();
        if !raw.is_finite() || raw < 2.0 {
            return Err(CoreError::invalid(
                "ensemble.steps_per_wcoh",
                format!(
                    "steps_per_wcoh ({}) x W_coh ({w_coh}) yields fewer than 2 steps",
                    self.steps_per_wcoh
                ),
            ));
        }
        if raw > f64::from(u32::MAX) {
            return Err(CoreError::invalid(
                "ensemble.steps_per_wcoh",
                format!("step count {raw} is too large"),
            ));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = raw as usize;
        Ok(steps)
    }
}

/// Slip law parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipLawConfig {
    /// Functional form of `q(W_coh)`.
    #[serde(default = "default_slip_form")]
    pub form: SlipForm,

    /// Power-law exponent.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Power-law prefactor.
    #[serde(default = "default_k_prefactor")]
    pub k_prefactor: f64,
}

impl Default for SlipLawConfig {
    fn default() -> Self {
        Self {
            form: default_slip_form(),
            alpha: default_alpha(),
            k_prefactor: default_k_prefactor(),
        }
    }
}

/// Single-thread kernel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Kernel family.
    #[serde(rename = "type", default = "default_kernel_kind")]
    pub kind: KernelKind,

    /// Step size recorded for provenance; the dynamics move one unit per step.
    #[serde(default = "default_step_size")]
    pub step_size: f64,

    /// Slip law.
    #[serde(default)]
    pub slip_law: SlipLawConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            kind: default_kernel_kind(),
            step_size: default_step_size(),
            slip_law: SlipLawConfig::default(),
        }
    }
}

impl KernelConfig {
    fn validate(&self) -> Result<(), CoreError> {
        if !self.slip_law.alpha.is_finite() {
            return Err(CoreError::invalid("kernel.slip_law.alpha", "must be finite"));
        }
        if !(self.slip_law.k_prefactor.is_finite() && self.slip_law.k_prefactor >= 0.0) {
            return Err(CoreError::invalid(
                "kernel.slip_law.k_prefactor",
                "must be finite and non-negative",
            ));
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(CoreError::invalid("kernel.step_size", "must be positive and finite"));
        }
        Ok(())
    }
}

/// Bundle coupling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleCouplingConfig {
    /// Coupling rule.
    #[serde(default = "default_coupling_mode")]
    pub mode: CouplingMode,

    /// Coupling strength `λ` in `[0, 1]`.
    #[serde(default)]
    pub coupling_strength: f64,
}

impl Default for BundleCouplingConfig {
    fn default() -> Self {
        Self {
            mode: default_coupling_mode(),
            coupling_strength: 0.0,
        }
    }
}

impl BundleCouplingConfig {
    fn validate(&self) -> Result<(), CoreError> {
        if !(0.0..=1.0).contains(&self.coupling_strength) {
            return Err(CoreError::invalid(
                "bundle_coupling.coupling_strength",
                format!("must lie in [0, 1], got {}", self.coupling_strength),
            ));
        }
        Ok(())
    }
}

/// Parameters of the phase law.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDynamicsParams {
    /// Base phase increment per step.
    #[serde(default = "default_base_rate")]
    pub base_rate: f64,

    /// How the increment scales with `W_coh`.
    #[serde(default = "default_wcoh_scaling")]
    pub wcoh_scaling: WcohScaling,

    /// Weight of bundle alignment in the increment.
    #[serde(default = "default_stability_weight")]
    pub stability_weight: f64,
}

impl Default for PhaseDynamicsParams {
    fn default() -> Self {
        Self {
            base_rate: default_base_rate(),
            wcoh_scaling: default_wcoh_scaling(),
            stability_weight: default_stability_weight(),
        }
    }
}

/// Phase dynamics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDynamicsConfig {
    /// Whether phases are tracked at all.
    #[serde(default)]
    pub enabled: bool,

    /// Phase law.
    #[serde(default = "default_phase_law")]
    pub law: PhaseLaw,

    /// Law parameters.
    #[serde(default)]
    pub params: PhaseDynamicsParams,
}

impl Default for PhaseDynamicsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            law: default_phase_law(),
            params: PhaseDynamicsParams::default(),
        }
    }
}

impl PhaseDynamicsConfig {
    fn validate(&self) -> Result<(), CoreError> {
        if !self.enabled {
            return Ok(());
        }
        if !self.params.base_rate.is_finite() {
            return Err(CoreError::invalid("phase_dynamics.params.base_rate", "must be finite"));
        }
        if !self.params.stability_weight.is_finite() {
            return Err(CoreError::invalid(
                "phase_dynamics.params.stability_weight",
                "must be finite",
            ));
        }
        Ok(())
    }
}

/// Welch PSD parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsdConfig {
    /// Segment taper.
    #[serde(default = "default_psd_window")]
    pub window: PsdWindow,

    /// Samples per segment.
    #[serde(default = "default_segment_length")]
    pub segment_length: usize,

    /// Fractional overlap between consecutive segments, in `[0, 1)`.
    #[serde(default = "default_overlap")]
    pub overlap: f64,
}

impl Default for PsdConfig {
    fn default() -> Self {
        Self {
            window: default_psd_window(),
            segment_length: default_segment_length(),
            overlap: default_overlap(),
        }
    }
}

/// Frequency band over which the acceleration amplitude is measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeFitConfig {
    /// Lower band edge (inclusive), in units of the sampling rate.
    #[serde(default = "default_freq_min")]
    pub freq_min: f64,

    /// Upper band edge (inclusive), in units of the sampling rate.
    #[serde(default = "default_freq_max")]
    pub freq_max: f64,
}

impl Default for AmplitudeFitConfig {
    fn default() -> Self {
        Self {
            freq_min: default_freq_min(),
            freq_max: default_freq_max(),
        }
    }
}

/// `log10(W_coh)` window used when fitting the amplitude exponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaFitConfig {
    /// Lower edge of the fit window (inclusive).
    #[serde(default = "default_log_wcoh_min")]
    pub log_wcoh_min: f64,

    /// Upper edge of the fit window (inclusive).
    #[serde(default = "default_log_wcoh_max")]
    pub log_wcoh_max: f64,
}

impl Default for BetaFitConfig {
    fn default() -> Self {
        Self {
            log_wcoh_min: default_log_wcoh_min(),
            log_wcoh_max: default_log_wcoh_max(),
        }
    }
}

/// Flip-statistics parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KappaEffConfig {
    /// Recorded for provenance; flip counts are tallied per step.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl Default for KappaEffConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
        }
    }
}

/// Evaporation detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifetimeConfig {
    /// Alignment below this value counts toward evaporation.
    #[serde(default = "default_f_min")]
    pub f_min: f64,

    /// Consecutive below-threshold steps that declare evaporation.
    #[serde(default = "default_evap_window")]
    pub evap_window: usize,
}

impl Default for LifetimeConfig {
    fn default() -> Self {
        Self {
            f_min: default_f_min(),
            evap_window: default_evap_window(),
        }
    }
}

/// Post-processing configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Welch PSD parameters.
    #[serde(default)]
    pub psd: PsdConfig,

    /// Amplitude band.
    #[serde(default)]
    pub amplitude_fit: AmplitudeFitConfig,

    /// Exponent fit window.
    #[serde(default)]
    pub beta_fit: BetaFitConfig,

    /// Flip statistics.
    #[serde(default)]
    pub kappa_eff: KappaEffConfig,

    /// Lifetime detection.
    #[serde(default)]
    pub lifetime: LifetimeConfig,
}

impl AnalysisConfig {
    fn validate(&self) -> Result<(), CoreError> {
        if self.psd.segment_length < 3 {
            return Err(CoreError::invalid("analysis.psd.segment_length", "must be at least 3"));
        }
        if !(0.0..1.0).contains(&self.psd.overlap) {
            return Err(CoreError::invalid(
                "analysis.psd.overlap",
                format!("must lie in [0, 1), got {}", self.psd.overlap),
            ));
        }
        let band = &self.amplitude_fit;
        let finite = band.freq_min.is_finite() && band.freq_max.is_finite();
        if !finite || band.freq_min > band.freq_max {
            return Err(CoreError::invalid(
                "analysis.amplitude_fit",
                format!("invalid band [{}, {}]", band.freq_min, band.freq_max),
            ));
        }
        if self.beta_fit.log_wcoh_min > self.beta_fit.log_wcoh_max {
            return Err(CoreError::invalid(
                "analysis.beta_fit",
                "log_wcoh_min must not exceed log_wcoh_max",
            ));
        }
        if self.kappa_eff.window_size == 0 {
            return Err(CoreError::invalid("analysis.kappa_eff.window_size", "must be at least 1"));
        }
        if self.lifetime.evap_window == 0 {
            return Err(CoreError::invalid("analysis.lifetime.evap_window", "must be at least 1"));
        }
        Ok(())
    }
}

/// Resolve every law selector present in `document` through its `FromStr`.
fn resolve_law_tags(document: &Value) -> Result<(), CoreError> {
    resolve_tag::<KernelKind>(document, &["kernel", "type"])?;
    resolve_tag::<SlipForm>(document, &["kernel", "slip_law", "form"])?;
    resolve_tag::<CouplingMode>(document, &["bundle_coupling", "mode"])?;
    resolve_tag::<PhaseLaw>(document, &["phase_dynamics", "law"])?;
    resolve_tag::<WcohScaling>(document, &["phase_dynamics", "params", "wcoh_scaling"])?;
    resolve_tag::<PsdWindow>(document, &["analysis", "psd", "window"])
}

/// Absent fields fall back to defaults; non-string values are left for serde
/// to reject with their position.
fn resolve_tag<T>(document: &Value, path: &[&str]) -> Result<(), CoreError>
where
    T: FromStr<Err = CoreError>,
{
    let tag = path
        .iter()
        .try_fold(document, |node, key| node.get(*key))
        .and_then(Value::as_str);
    match tag {
        Some(tag) => tag.parse::<T>().map(drop),
        None => Ok(()),
    }
}

/// Accept either a scalar or a sequence for grid fields.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_model_name() -> String {
    "bundle_soft_rudder_v0".to_owned()
}

fn default_output_dir() -> String {
    "outputs_bundles/bundle_soft_rudder_v0".to_owned()
}

const fn default_random_seed() -> u64 {
    12_345
}

const fn default_n_ensembles() -> usize {
    50
}

const fn default_steps_per_wcoh() -> u32 {
    1000
}

const fn default_kernel_kind() -> KernelKind {
    KernelKind::SoftRudderBundle
}

const fn default_step_size() -> f64 {
    1.0
}

const fn default_slip_form() -> SlipForm {
    SlipForm::PowerLaw
}

const fn default_alpha() -> f64 {
    1.0
}

const fn default_k_prefactor() -> f64 {
    2.0
}

const fn default_coupling_mode() -> CouplingMode {
    CouplingMode::Independent
}

const fn default_base_rate() -> f64 {
    1.0
}

const fn default_wcoh_scaling() -> WcohScaling {
    WcohScaling::None
}

const fn default_stability_weight() -> f64 {
    0.5
}

const fn default_phase_law() -> PhaseLaw {
    PhaseLaw::BundleStabilityV0
}

const fn default_psd_window() -> PsdWindow {
    PsdWindow::Hann
}

const fn default_segment_length() -> usize {
    4096
}

const fn default_overlap() -> f64 {
    0.5
}

const fn default_freq_min() -> f64 {
    0.01
}

const fn default_freq_max() -> f64 {
    0.1
}

const fn default_log_wcoh_min() -> f64 {
    1.0
}

const fn default_log_wcoh_max() -> f64 {
    2.5
}

const fn default_window_size() -> usize {
    1
}

const fn default_f_min() -> f64 {
    0.6
}

const fn default_evap_window() -> usize {
    20
}
