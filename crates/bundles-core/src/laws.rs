//! Closed, string-tagged law selectors.
//!
//! Configuration files name kernels, slip laws, coupling modes, phase laws,
//! W-scalings, and PSD windows by string tag. Each selector is a closed enum
//! resolved from its tag when the configuration is loaded, so an unknown tag
//! fails at load time instead of deep inside the step loop.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Generates a string-tagged enum with `as_str`, `Display`, `FromStr`, and
/// serde support through its tag.
macro_rules! define_tag {
    (
        $(#[$meta:meta])*
        $name:ident ($parameter:literal) {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $tag:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every accepted tag, in declaration order.
            pub const TAGS: &'static [&'static str] = &[$($tag),+];

            /// The configuration tag for this variant.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $tag,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(tag: &str) -> Result<Self, Self::Err> {
                match tag {
                    $($tag => Ok(Self::$variant),)+
                    other => Err(CoreError::invalid(
                        $parameter,
                        format!(
                            "unknown tag `{other}` (expected one of: {})",
                            Self::TAGS.join(", ")
                        ),
                    )),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(tag: String) -> Result<Self, Self::Error> {
                tag.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_owned()
            }
        }
    };
}

define_tag! {
    /// Single-thread update kernel.
    KernelKind ("kernel.type") {
        /// Two-state soft-rudder walker: each step a thread keeps or reverses
        /// its direction, then moves one unit along it.
        SoftRudderBundle => "soft_rudder_bundle",
    }
}

define_tag! {
    /// Functional form of the slip probability `q(W_coh)`.
    SlipForm ("kernel.slip_law.form") {
        /// `q = k_prefactor / W_coh^alpha`, clipped to `[0, 1]`.
        PowerLaw => "power_law",
    }
}

define_tag! {
    /// How bundle alignment feeds back into each thread's stay probability.
    CouplingMode ("bundle_coupling.mode") {
        /// Threads ignore each other.
        Independent => "independent",
        /// Stay probability rises linearly with alignment.
        SharedBias => "shared_bias",
        /// Stay probability rises with squared alignment (stress-test limit).
        StrongLock => "strong_lock",
    }
}

define_tag! {
    /// Phase accumulation law.
    PhaseLaw ("phase_dynamics.law") {
        /// `Δθ = base_rate · f_W · (1 + stability_weight · S_v)`.
        BundleStabilityV0 => "bundle_stability_v0",
    }
}

define_tag! {
    /// Scaling of the phase rate with coherence horizon.
    WcohScaling ("phase_dynamics.params.wcoh_scaling") {
        /// `f_W = 1`.
        None => "none",
        /// `f_W = 1 / W_coh`.
        Inverse => "inverse",
        /// `f_W = 1 / sqrt(W_coh)`.
        SqrtInverse => "sqrt_inverse",
    }
}

define_tag! {
    /// Taper applied to each Welch segment.
    PsdWindow ("analysis.psd.window") {
        /// Symmetric Hann window.
        Hann => "hann",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_from_str() {
        for tag in CouplingMode::TAGS {
            let mode: CouplingMode = tag.parse().unwrap();
            assert_eq!(mode.as_str(), *tag);
        }
        assert_eq!(WcohScaling::SqrtInverse.to_string(), "sqrt_inverse");
        assert_eq!(PhaseLaw::BundleStabilityV0.as_str(), "bundle_stability_v0");
    }

    #[test]
    fn unknown_tag_names_the_parameter() {
        let err = "mean_field".parse::<CouplingMode>().unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidParameter { ref parameter, .. } if parameter == "bundle_coupling.mode"
        ));

        let message = err.to_string();
        assert!(message.contains("bundle_coupling.mode"));
        assert!(message.contains("mean_field"));
        assert!(message.contains("shared_bias"));
    }

    #[test]
    fn serde_uses_tags() {
        let json = serde_json::to_string(&SlipForm::PowerLaw).unwrap();
        assert_eq!(json, "\"power_law\"");

        let parsed: WcohScaling = serde_json::from_str("\"inverse\"").unwrap();
        assert_eq!(parsed, WcohScaling::Inverse);

        let rejected: Result<PsdWindow, _> = serde_json::from_str("\"blackman\"");
        assert!(rejected.is_err());
    }
}
