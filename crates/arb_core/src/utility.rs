//! The closed utility function family (§4.1) — **data only**. Evaluation,
//! gradients, and linearization live in `arb_algo::utility`, which implements
//! a local trait over these foreign types, keeping domain enums in the core
//! crate and the algorithms that act on them in the algorithm crate.

use std::collections::BTreeMap;

use crate::constants::WEIGHT_NORMALIZATION_TOLERANCE;
use crate::errors::CoreError;
use crate::resource::ResourceKind;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nonnegative weights over resource kinds, normalized to sum to 1 within
/// `WEIGHT_NORMALIZATION_TOLERANCE`.
pub type PreferenceWeights = BTreeMap<ResourceKind, f64>;

/// Validate and normalize raw nonnegative weights so they sum to exactly 1.0.
/// Rejects negative weights and the all-zero case (§4.1 failure modes).
pub fn normalize_weights(raw: BTreeMap<ResourceKind, f64>) -> Result<PreferenceWeights, CoreError> {
    for (k, &w) in &raw {
        if w < 0.0 {
            return Err(CoreError::NegativeWeight { resource: k.as_str() });
        }
    }
    let sum: f64 = raw.values().sum();
    if sum <= 0.0 {
        return Err(CoreError::DegenerateWeights);
    }
    Ok(raw.into_iter().map(|(k, w)| (k, w / sum)).collect())
}

/// Weights are considered normalized if they sum to 1 within tolerance (§3,
/// §8 "Weight normalization" property).
pub fn is_normalized(weights: &PreferenceWeights) -> bool {
    let sum: f64 = weights.values().sum();
    (sum - 1.0).abs() <= WEIGHT_NORMALIZATION_TOLERANCE
}

/// A single nest of a two-level CES utility: its own weights and elasticity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Nest {
    pub weights: PreferenceWeights,
    pub rho: f64,
}

/// The closed, tagged family of concave (or quasi-concave) utility forms.
/// Wrapper variants (`Threshold`, `Satiation`, `PiecewiseLinear`) hold an
/// owned inner variant by value, forming an acyclic tree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind"))]
pub enum UtilityForm {
    Linear {
        weights: PreferenceWeights,
        offset: f64,
    },
    Sqrt {
        weights: PreferenceWeights,
    },
    Log {
        weights: PreferenceWeights,
        base: f64,
    },
    CobbDouglas {
        weights: PreferenceWeights,
    },
    Leontief {
        weights: PreferenceWeights,
    },
    Ces {
        weights: PreferenceWeights,
        rho: f64,
    },
    Threshold {
        base: Box<UtilityForm>,
        total_threshold: f64,
        k: f64,
    },
    Satiation {
        base: Box<UtilityForm>,
        v_max: f64,
        k: f64,
        hyperbolic: bool,
    },
    NestedCes {
        nests: Vec<Nest>,
        nest_weights: Vec<f64>,
        outer_rho: f64,
    },
    SoftplusLossAversion {
        weights: PreferenceWeights,
        reference: BTreeMap<ResourceKind, f64>,
        lambda: f64,
        tau: f64,
    },
    AsymmetricLogLossAversion {
        weights: PreferenceWeights,
        reference: BTreeMap<ResourceKind, f64>,
        lambda: f64,
        kappa: f64,
    },
    PiecewiseLinear {
        base: Box<UtilityForm>,
        n_segments: u32,
        domain_max: f64,
    },
}

impl UtilityForm {
    pub fn linear(weights: BTreeMap<ResourceKind, f64>, offset: f64) -> Result<Self, CoreError> {
        Ok(UtilityForm::Linear {
            weights: normalize_weights(weights)?,
            offset,
        })
    }

    pub fn sqrt(weights: BTreeMap<ResourceKind, f64>) -> Result<Self, CoreError> {
        Ok(UtilityForm::Sqrt {
            weights: normalize_weights(weights)?,
        })
    }

    pub fn log(weights: BTreeMap<ResourceKind, f64>, base: f64) -> Result<Self, CoreError> {
        if !(base.is_finite() && base > 1.0) {
            return Err(CoreError::MalformedUtilityParams(format!(
                "log base must be finite and > 1, got {base}"
            )));
        }
        Ok(UtilityForm::Log {
            weights: normalize_weights(weights)?,
            base,
        })
    }

    pub fn cobb_douglas(weights: BTreeMap<ResourceKind, f64>) -> Result<Self, CoreError> {
        Ok(UtilityForm::CobbDouglas {
            weights: normalize_weights(weights)?,
        })
    }

    pub fn leontief(weights: BTreeMap<ResourceKind, f64>) -> Result<Self, CoreError> {
        Ok(UtilityForm::Leontief {
            weights: normalize_weights(weights)?,
        })
    }

    pub fn ces(weights: BTreeMap<ResourceKind, f64>, rho: f64) -> Result<Self, CoreError> {
        if !rho.is_finite() {
            return Err(CoreError::MalformedUtilityParams("CES rho must be finite".into()));
        }
        if rho >= 1.0 {
            return Err(CoreError::MalformedUtilityParams(format!(
                "CES rho must be < 1 for concavity, got {rho}"
            )));
        }
        Ok(UtilityForm::Ces {
            weights: normalize_weights(weights)?,
            rho,
        })
    }

    pub fn threshold(base: UtilityForm, total_threshold: f64, k: f64) -> Result<Self, CoreError> {
        if !k.is_finite() || k <= 0.0 {
            return Err(CoreError::MalformedUtilityParams(format!(
                "threshold steepness k must be finite and positive, got {k}"
            )));
        }
        Ok(UtilityForm::Threshold {
            base: Box::new(base),
            total_threshold,
            k,
        })
    }

    pub fn satiation(base: UtilityForm, v_max: f64, k: f64, hyperbolic: bool) -> Result<Self, CoreError> {
        if !(v_max.is_finite() && v_max > 0.0) {
            return Err(CoreError::MalformedUtilityParams(format!(
                "satiation v_max must be finite and positive, got {v_max}"
            )));
        }
        if !(k.is_finite() && k > 0.0) {
            return Err(CoreError::MalformedUtilityParams(format!(
                "satiation k must be finite and positive, got {k}"
            )));
        }
        Ok(UtilityForm::Satiation {
            base: Box::new(base),
            v_max,
            k,
            hyperbolic,
        })
    }

    pub fn nested_ces(nests: Vec<Nest>, nest_weights_raw: Vec<f64>, outer_rho: f64) -> Result<Self, CoreError> {
        if nests.is_empty() || nests.len() != nest_weights_raw.len() {
            return Err(CoreError::MalformedUtilityParams(
                "nested CES requires a nonempty nests/nest_weights pair of equal length".into(),
            ));
        }
        if !outer_rho.is_finite() || outer_rho >= 1.0 {
            return Err(CoreError::MalformedUtilityParams(format!(
                "nested CES outer rho must be finite and < 1, got {outer_rho}"
            )));
        }
        if nest_weights_raw.iter().any(|&w| w < 0.0) {
            return Err(CoreError::NegativeWeight { resource: "nest_weights" });
        }
        let sum: f64 = nest_weights_raw.iter().sum();
        if sum <= 0.0 {
            return Err(CoreError::DegenerateWeights);
        }
        let nest_weights = nest_weights_raw.into_iter().map(|w| w / sum).collect();
        let mut checked_nests = Vec::with_capacity(nests.len());
        for nest in nests {
            if !nest.rho.is_finite() || nest.rho >= 1.0 {
                return Err(CoreError::MalformedUtilityParams(format!(
                    "nested CES inner rho must be finite and < 1, got {}",
                    nest.rho
                )));
            }
            checked_nests.push(Nest {
                weights: normalize_weights(nest.weights)?,
                rho: nest.rho,
            });
        }
        Ok(UtilityForm::NestedCes {
            nests: checked_nests,
            nest_weights,
            outer_rho,
        })
    }

    pub fn softplus_loss_aversion(
        weights: BTreeMap<ResourceKind, f64>,
        reference: BTreeMap<ResourceKind, f64>,
        lambda: f64,
        tau: f64,
    ) -> Result<Self, CoreError> {
        if !(lambda.is_finite() && lambda > 1.0) {
            return Err(CoreError::MalformedUtilityParams(format!(
                "softplus loss aversion requires lambda > 1, got {lambda}"
            )));
        }
        if !(tau.is_finite() && tau > 0.0) {
            return Err(CoreError::MalformedUtilityParams(format!(
                "softplus loss aversion requires tau > 0, got {tau}"
            )));
        }
        Ok(UtilityForm::SoftplusLossAversion {
            weights: normalize_weights(weights)?,
            reference,
            lambda,
            tau,
        })
    }

    pub fn asymmetric_log_loss_aversion(
        weights: BTreeMap<ResourceKind, f64>,
        reference: BTreeMap<ResourceKind, f64>,
        lambda: f64,
        kappa: f64,
    ) -> Result<Self, CoreError> {
        if !(lambda.is_finite() && lambda >= 1.0) {
            return Err(CoreError::MalformedUtilityParams(format!(
                "asymmetric log loss aversion requires lambda >= 1, got {lambda}"
            )));
        }
        if !(kappa.is_finite() && kappa > 0.0) {
            return Err(CoreError::MalformedUtilityParams(format!(
                "asymmetric log loss aversion requires kappa > 0, got {kappa}"
            )));
        }
        Ok(UtilityForm::AsymmetricLogLossAversion {
            weights: normalize_weights(weights)?,
            reference,
            lambda,
            kappa,
        })
    }

    pub fn piecewise_linear(base: UtilityForm, n_segments: u32, domain_max: f64) -> Result<Self, CoreError> {
        if n_segments == 0 {
            return Err(CoreError::MalformedUtilityParams(
                "piecewise linear requires at least one segment".into(),
            ));
        }
        if !(domain_max.is_finite() && domain_max > 0.0) {
            return Err(CoreError::MalformedUtilityParams(format!(
                "piecewise linear domain_max must be finite and positive, got {domain_max}"
            )));
        }
        Ok(UtilityForm::PiecewiseLinear {
            base: Box::new(base),
            n_segments,
            domain_max,
        })
    }

    /// Whether this variant is strictly concave (convex-compatible) or only
    /// quasi-concave (Leontief). §4.1 `is_convex_compatible`.
    pub fn is_convex_compatible(&self) -> bool {
        !matches!(self, UtilityForm::Leontief { .. })
    }
}
