//! Marginal rate of substitution and elasticity of substitution (§4.1):
//! derived quantities over the gradient, analytic where the closed form is
//! cheap (Linear, Leontief, Cobb-Douglas, CES) and a one-sided numerical
//! difference everywhere else.

use std::collections::BTreeMap;

use arb_core::resource::ResourceKind;
use arb_core::utility::UtilityForm;
use arb_core::EPSILON;

use super::UtilityEval;
use crate::mathutil::floor_positive;

/// `gradient[i] / gradient[j]` at `allocation`: how many units of `j`
/// compensate for losing one unit of `i`. `+inf` if `j`'s marginal value is
/// (numerically) zero.
pub fn marginal_rate_of_substitution(
    form: &UtilityForm,
    allocation: &BTreeMap<ResourceKind, f64>,
    i: ResourceKind,
    j: ResourceKind,
) -> f64 {
    let grad = form.gradient(allocation);
    let gi = grad.get(&i).copied().unwrap_or(0.0);
    let gj = grad.get(&j).copied().unwrap_or(0.0);
    if gj.abs() < EPSILON {
        f64::INFINITY
    } else {
        gi / gj
    }
}

/// Elasticity of substitution between resources `i` and `j` at `allocation`.
/// Linear is perfect substitutes (+inf); Leontief is perfect complements
/// (0); Cobb-Douglas is unit elasticity (1); CES is analytic
/// `sigma = 1 / (1 - rho)`. Every other variant falls back to a one-sided
/// numerical difference of `d ln(a_j/a_i) / d ln(MRS_ij)`.
pub fn elasticity_of_substitution(
    form: &UtilityForm,
    allocation: &BTreeMap<ResourceKind, f64>,
    i: ResourceKind,
    j: ResourceKind,
) -> f64 {
    match form {
        UtilityForm::Linear { .. } => f64::INFINITY,
        UtilityForm::Leontief { .. } => 0.0,
        UtilityForm::CobbDouglas { .. } => 1.0,
        UtilityForm::Ces { rho, .. } => 1.0 / (1.0 - rho),
        _ => numeric_elasticity(form, allocation, i, j),
    }
}

const NUMERIC_STEP: f64 = 1.0;

fn numeric_elasticity(form: &UtilityForm, allocation: &BTreeMap<ResourceKind, f64>, i: ResourceKind, j: ResourceKind) -> f64 {
    let ai = floor_positive(allocation.get(&i).copied().unwrap_or(0.0));
    let aj = floor_positive(allocation.get(&j).copied().unwrap_or(0.0));

    let mrs0 = marginal_rate_of_substitution(form, allocation, i, j);
    let mut bumped = allocation.clone();
    bumped.insert(j, aj + NUMERIC_STEP);
    let mrs1 = marginal_rate_of_substitution(form, &bumped, i, j);

    if !mrs0.is_finite() || !mrs1.is_finite() || mrs0 <= 0.0 || mrs1 <= 0.0 {
        return 0.0;
    }

    let ratio0 = (aj / ai).max(EPSILON);
    let ratio1 = ((aj + NUMERIC_STEP) / ai).max(EPSILON);
    let d_ln_ratio = ratio1.ln() - ratio0.ln();
    let d_ln_mrs = mrs1.ln() - mrs0.ln();

    if d_ln_mrs.abs() < 1e-12 {
        f64::INFINITY
    } else {
        d_ln_ratio / d_ln_mrs
    }
}
