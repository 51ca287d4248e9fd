//! Per-variant evaluate/gradient formulas for the closed utility family.
//! Kept as one file: the twelve forms share enough numeric plumbing —
//! `floor_positive`, `sigmoid`, `softplus` — that splitting them further
//! would just scatter the shared helpers.

use std::collections::BTreeMap;

use arb_core::resource::ResourceKind;
use arb_core::utility::{Nest, UtilityForm};
use arb_core::{CES_COBB_DOUGLAS_THRESHOLD, CES_LEONTIEF_THRESHOLD, EPSILON, SIGMOID_SATURATION};

use crate::mathutil::{floor_positive, sigmoid, softplus};
use crate::utility::alloc_of;

pub(super) fn evaluate(form: &UtilityForm, allocation: &BTreeMap<ResourceKind, f64>) -> f64 {
    match form {
        UtilityForm::Linear { weights, offset } => {
            offset + weights.iter().map(|(k, &w)| w * alloc_of(allocation, *k)).sum::<f64>()
        }
        UtilityForm::Sqrt { weights } => weights
            .iter()
            .map(|(k, &w)| w * floor_positive(alloc_of(allocation, *k)).sqrt())
            .sum(),
        UtilityForm::Log { weights, base } => weights
            .iter()
            .map(|(k, &w)| w * (1.0 + alloc_of(allocation, *k)).ln() / base.ln())
            .sum(),
        UtilityForm::CobbDouglas { weights } => cobb_douglas_value(weights, allocation),
        UtilityForm::Leontief { weights } => leontief_value(weights, allocation),
        UtilityForm::Ces { weights, rho } => ces_value(weights, *rho, allocation),
        UtilityForm::Threshold { base, total_threshold, k } => {
            let base_u = evaluate(base, allocation);
            let total: f64 = ResourceKind::ALL.iter().map(|r| alloc_of(allocation, *r)).sum();
            base_u * sigmoid(saturate(k * (total - total_threshold)))
        }
        UtilityForm::Satiation { base, v_max, k, hyperbolic } => {
            let base_u = evaluate(base, allocation);
            satiate(base_u, *v_max, *k, *hyperbolic)
        }
        UtilityForm::NestedCes { nests, nest_weights, outer_rho } => {
            nested_ces_value(nests, nest_weights, *outer_rho, allocation)
        }
        UtilityForm::SoftplusLossAversion { weights, reference, lambda, tau } => weights
            .iter()
            .map(|(k, &w)| {
                let d = alloc_of(allocation, *k) - reference.get(k).copied().unwrap_or(0.0);
                w * loss_averse_kink(d, *lambda, *tau)
            })
            .sum(),
        UtilityForm::AsymmetricLogLossAversion { weights, reference, lambda, kappa } => weights
            .iter()
            .map(|(k, &w)| {
                let d = alloc_of(allocation, *k) - reference.get(k).copied().unwrap_or(0.0);
                w * asymmetric_log_value(d, *lambda, *kappa)
            })
            .sum(),
        UtilityForm::PiecewiseLinear { base, n_segments, domain_max } => {
            piecewise_linear_value(base, *n_segments, *domain_max, allocation)
        }
    }
}

pub(super) fn gradient(form: &UtilityForm, allocation: &BTreeMap<ResourceKind, f64>) -> BTreeMap<ResourceKind, f64> {
    match form {
        UtilityForm::Linear { weights, .. } => weights.clone(),
        UtilityForm::Sqrt { weights } => weights
            .iter()
            .map(|(k, &w)| (*k, w / (2.0 * floor_positive(alloc_of(allocation, *k)).sqrt())))
            .collect(),
        UtilityForm::Log { weights, base } => weights
            .iter()
            .map(|(k, &w)| (*k, w / ((1.0 + alloc_of(allocation, *k)) * base.ln())))
            .collect(),
        UtilityForm::CobbDouglas { weights } => {
            let starved: Vec<ResourceKind> = weights
                .iter()
                .filter(|(k, &w)| w > 0.0 && alloc_of(allocation, **k) <= 0.0)
                .map(|(k, _)| *k)
                .collect();
            if !starved.is_empty() {
                // Boundary subgradient: with exactly one resource pinned at
                // zero, its marginal utility is unbounded (the first unit of
                // a starved good is worth everything when Phi = 0) while
                // every other resource's is exactly 0, since moving them
                // can't lift Phi off zero while the starved one stays at
                // zero. With more than one resource pinned at zero, Phi stays
                // at 0 regardless of any single component, so the whole
                // gradient is 0. `1.0 / EPSILON` stands in for "unbounded"
                // without handing the water-filling bisection an actual
                // infinity to divide by.
                return weights
                    .keys()
                    .map(|k| (*k, if starved.len() == 1 && starved[0] == *k { 1.0 / EPSILON } else { 0.0 }))
                    .collect();
            }
            let u = cobb_douglas_value(weights, allocation);
            weights
                .iter()
                .map(|(k, &w)| (*k, w * u / floor_positive(alloc_of(allocation, *k))))
                .collect()
        }
        UtilityForm::Leontief { weights } => leontief_gradient(weights, allocation),
        UtilityForm::Ces { weights, rho } => ces_gradient(weights, *rho, allocation),
        UtilityForm::Threshold { base, total_threshold, k } => {
            let base_u = evaluate(base, allocation);
            let base_grad = gradient(base, allocation);
            let total: f64 = ResourceKind::ALL.iter().map(|r| alloc_of(allocation, *r)).sum();
            let s = sigmoid(saturate(k * (total - total_threshold)));
            let s_prime = s * (1.0 - s) * k;
            ResourceKind::ALL
                .iter()
                .map(|r| {
                    let bg = base_grad.get(r).copied().unwrap_or(0.0);
                    (*r, bg * s + base_u * s_prime)
                })
                .collect()
        }
        UtilityForm::Satiation { base, v_max, k, hyperbolic } => {
            let base_u = evaluate(base, allocation);
            let base_grad = gradient(base, allocation);
            let slope = satiate_slope(base_u, *v_max, *k, *hyperbolic);
            base_grad.into_iter().map(|(r, g)| (r, g * slope)).collect()
        }
        UtilityForm::NestedCes { nests, nest_weights, outer_rho } => {
            nested_ces_gradient(nests, nest_weights, *outer_rho, allocation)
        }
        UtilityForm::SoftplusLossAversion { weights, reference, lambda, tau } => weights
            .iter()
            .map(|(k, &w)| {
                let d = alloc_of(allocation, *k) - reference.get(k).copied().unwrap_or(0.0);
                (*k, w * loss_averse_kink_slope(d, *lambda, *tau))
            })
            .collect(),
        UtilityForm::AsymmetricLogLossAversion { weights, reference, lambda, kappa } => weights
            .iter()
            .map(|(k, &w)| {
                let d = alloc_of(allocation, *k) - reference.get(k).copied().unwrap_or(0.0);
                (*k, w * asymmetric_log_slope(d, *lambda, *kappa))
            })
            .collect(),
        UtilityForm::PiecewiseLinear { base, n_segments, domain_max } => {
            piecewise_linear_gradient(base, *n_segments, *domain_max, allocation)
        }
    }
}

fn saturate(x: f64) -> f64 {
    x.clamp(-SIGMOID_SATURATION, SIGMOID_SATURATION)
}

/// Cobb-Douglas is genuinely zero when any weighted resource itself is at
/// zero allocation (§4.1: "if any aⱼ=0 and wⱼ>0 then Φ=0") — the product
/// form can't be papered over with the small positive floor the interior
/// gradient needs to stay finite.
fn cobb_douglas_value(weights: &BTreeMap<ResourceKind, f64>, allocation: &BTreeMap<ResourceKind, f64>) -> f64 {
    if weights.iter().any(|(k, &w)| w > 0.0 && alloc_of(allocation, *k) <= 0.0) {
        return 0.0;
    }
    weights
        .iter()
        .map(|(k, &w)| floor_positive(alloc_of(allocation, *k)).powf(w))
        .product()
}

fn leontief_value(weights: &BTreeMap<ResourceKind, f64>, allocation: &BTreeMap<ResourceKind, f64>) -> f64 {
    weights
        .iter()
        .map(|(k, &w)| alloc_of(allocation, *k) / floor_positive(w))
        .fold(f64::INFINITY, f64::min)
}

/// Leontief's gradient is a subgradient: mass goes to the binding (minimal)
/// resource(s). Ties are broken by the resource's position in
/// `ResourceKind::ALL` (Compute < ApiCredits < Memory < Storage) — a
/// deliberate, deterministic pick where the theory leaves the subgradient
/// set undetermined.
fn leontief_gradient(weights: &BTreeMap<ResourceKind, f64>, allocation: &BTreeMap<ResourceKind, f64>) -> BTreeMap<ResourceKind, f64> {
    let mut best: Option<(ResourceKind, f64)> = None;
    for (k, &w) in weights {
        let ratio = alloc_of(allocation, *k) / floor_positive(w);
        match best {
            None => best = Some((*k, ratio)),
            Some((_, br)) if ratio < br => best = Some((*k, ratio)),
            _ => {}
        }
    }
    let mut out = BTreeMap::new();
    if let Some((binding, _)) = best {
        let w = weights.get(&binding).copied().unwrap_or(1.0);
        out.insert(binding, 1.0 / floor_positive(w));
    }
    out
}

fn ces_value(weights: &BTreeMap<ResourceKind, f64>, rho: f64, allocation: &BTreeMap<ResourceKind, f64>) -> f64 {
    if rho.abs() < CES_COBB_DOUGLAS_THRESHOLD {
        cobb_douglas_value(weights, allocation)
    } else if rho <= CES_LEONTIEF_THRESHOLD {
        leontief_value(weights, allocation)
    } else {
        let inner: f64 = weights
            .iter()
            .map(|(k, &w)| w * floor_positive(alloc_of(allocation, *k)).powf(rho))
            .sum();
        inner.max(EPSILON).powf(1.0 / rho)
    }
}

fn ces_gradient(weights: &BTreeMap<ResourceKind, f64>, rho: f64, allocation: &BTreeMap<ResourceKind, f64>) -> BTreeMap<ResourceKind, f64> {
    if rho.abs() < CES_COBB_DOUGLAS_THRESHOLD {
        let u = cobb_douglas_value(weights, allocation);
        return weights
            .iter()
            .map(|(k, &w)| (*k, w * u / floor_positive(alloc_of(allocation, *k))))
            .collect();
    }
    if rho <= CES_LEONTIEF_THRESHOLD {
        return leontief_gradient(weights, allocation);
    }
    let u = ces_value(weights, rho, allocation);
    weights
        .iter()
        .map(|(k, &w)| {
            let a = floor_positive(alloc_of(allocation, *k));
            (*k, w * a.powf(rho - 1.0) * u.powf(1.0 - rho))
        })
        .collect()
}

fn nest_value(nest: &Nest, allocation: &BTreeMap<ResourceKind, f64>) -> f64 {
    ces_value(&nest.weights, nest.rho, allocation)
}

fn nested_ces_value(nests: &[Nest], nest_weights: &[f64], outer_rho: f64, allocation: &BTreeMap<ResourceKind, f64>) -> f64 {
    let nest_utilities: Vec<f64> = nests.iter().map(|n| nest_value(n, allocation)).collect();
    if outer_rho.abs() < CES_COBB_DOUGLAS_THRESHOLD {
        nest_utilities
            .iter()
            .zip(nest_weights)
            .map(|(&u, &w)| floor_positive(u).powf(w))
            .product()
    } else if outer_rho <= CES_LEONTIEF_THRESHOLD {
        nest_utilities
            .iter()
            .zip(nest_weights)
            .map(|(&u, &w)| u / floor_positive(w))
            .fold(f64::INFINITY, f64::min)
    } else {
        let inner: f64 = nest_utilities
            .iter()
            .zip(nest_weights)
            .map(|(&u, &w)| w * floor_positive(u).powf(outer_rho))
            .sum();
        inner.max(EPSILON).powf(1.0 / outer_rho)
    }
}

fn nested_ces_gradient(nests: &[Nest], nest_weights: &[f64], outer_rho: f64, allocation: &BTreeMap<ResourceKind, f64>) -> BTreeMap<ResourceKind, f64> {
    let nest_utilities: Vec<f64> = nests.iter().map(|n| nest_value(n, allocation)).collect();
    let outer_u = nested_ces_value(nests, nest_weights, outer_rho, allocation);

    let mut out: BTreeMap<ResourceKind, f64> = BTreeMap::new();
    for (i, nest) in nests.iter().enumerate() {
        let ui = floor_positive(nest_utilities[i]);
        let wi = nest_weights[i];
        // d(outer)/d(ui): Cobb-Douglas, Leontief, and CES outer aggregators.
        let d_outer_d_ui = if outer_rho.abs() < CES_COBB_DOUGLAS_THRESHOLD {
            wi * outer_u / ui
        } else if outer_rho <= CES_LEONTIEF_THRESHOLD {
            // binding nest gets full weight, others zero (Leontief subgradient)
            let is_binding = nest_utilities
                .iter()
                .zip(nest_weights)
                .map(|(&u, &w)| u / floor_positive(w))
                .enumerate()
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
                .map(|(idx, _)| idx)
                == Some(i);
            if is_binding { 1.0 / floor_positive(wi) } else { 0.0 }
        } else {
            wi * ui.powf(outer_rho - 1.0) * outer_u.powf(1.0 - outer_rho)
        };

        let inner_grad = ces_gradient(&nest.weights, nest.rho, allocation);
        for (k, g) in inner_grad {
            *out.entry(k).or_insert(0.0) += d_outer_d_ui * g;
        }
    }
    out
}

/// `g(x) = tau*ln(1+e^(x/tau)) - lambda*tau*ln(1+e^(-x/tau))`: a smooth kink
/// centered at the reference point. For gains (`x > 0`) it tends toward the
/// identity; for losses it tends toward `lambda * x`, the loss-aversion
/// multiplier (§4.1 reference-dependent forms).
fn loss_averse_kink(x: f64, lambda: f64, tau: f64) -> f64 {
    tau * softplus(x / tau) - lambda * tau * softplus(-x / tau)
}

fn loss_averse_kink_slope(x: f64, lambda: f64, tau: f64) -> f64 {
    sigmoid(x / tau) + lambda * sigmoid(-x / tau)
}

/// Gains `ln(1 + d/kappa)`, losses `-lambda * ln(1 + |d|/kappa)` (§4.1): kappa
/// scales how many units of the reference point it takes to double the
/// log argument, on both sides of the kink.
fn asymmetric_log_value(d: f64, lambda: f64, kappa: f64) -> f64 {
    if d >= 0.0 {
        (1.0 + d / kappa).ln()
    } else {
        -lambda * (1.0 + (-d) / kappa).ln()
    }
}

fn asymmetric_log_slope(d: f64, lambda: f64, kappa: f64) -> f64 {
    if d >= 0.0 {
        1.0 / (kappa + d)
    } else {
        lambda / (kappa - d)
    }
}

/// Diminishing-returns cap on a base utility's scalar output. `hyperbolic`
/// selects `v_max*u/(u+k)` over the exponential `v_max*(1-e^(-u/k))`.
fn satiate(base_u: f64, v_max: f64, k: f64, hyperbolic: bool) -> f64 {
    let u = base_u.max(0.0);
    if hyperbolic {
        v_max * u / (u + k)
    } else {
        v_max * (1.0 - (-u / k).exp())
    }
}

fn satiate_slope(base_u: f64, v_max: f64, k: f64, hyperbolic: bool) -> f64 {
    let u = base_u.max(0.0);
    if hyperbolic {
        v_max * k / (u + k).powi(2)
    } else {
        (v_max / k) * (-u / k).exp()
    }
}

/// Approximates `base` as a piecewise-linear envelope of its value along the
/// ray from the origin to the current allocation, in `n_segments` equal
/// steps over `[0, domain_max]` of the aggregate allocation `sum(a)`.
fn piecewise_linear_value(base: &UtilityForm, n_segments: u32, domain_max: f64, allocation: &BTreeMap<ResourceKind, f64>) -> f64 {
    let s: f64 = ResourceKind::ALL.iter().map(|r| alloc_of(allocation, *r)).sum();
    let s = s.min(domain_max).max(0.0);
    let step = domain_max / n_segments as f64;
    let ray_point = |x: f64| -> BTreeMap<ResourceKind, f64> {
        if s <= EPSILON {
            BTreeMap::new()
        } else {
            ResourceKind::ALL
                .iter()
                .map(|r| (*r, alloc_of(allocation, *r) * (x / s)))
                .collect()
        }
    };
    let full_segments = (s / step).floor() as u32;
    let mut total = 0.0;
    let mut boundary = 0.0;
    for _ in 0..full_segments.min(n_segments) {
        let next = (boundary + step).min(s);
        let slope = (evaluate(base, &ray_point(next)) - evaluate(base, &ray_point(boundary))) / step.max(EPSILON);
        total += slope * (next - boundary);
        boundary = next;
    }
    if boundary < s {
        let next = (boundary + step).min(domain_max);
        let slope = (evaluate(base, &ray_point(next)) - evaluate(base, &ray_point(boundary))) / step.max(EPSILON);
        total += slope * (s - boundary);
    }
    total
}

fn piecewise_linear_gradient(base: &UtilityForm, n_segments: u32, domain_max: f64, allocation: &BTreeMap<ResourceKind, f64>) -> BTreeMap<ResourceKind, f64> {
    let s: f64 = ResourceKind::ALL.iter().map(|r| alloc_of(allocation, *r)).sum();
    let s = s.min(domain_max).max(0.0);
    let step = domain_max / n_segments as f64;
    let seg_index = (s / step).floor().min((n_segments - 1) as f64);
    let boundary = seg_index * step;
    let next = (boundary + step).min(domain_max);
    let ray_point = |x: f64| -> BTreeMap<ResourceKind, f64> {
        if s <= EPSILON {
            BTreeMap::new()
        } else {
            ResourceKind::ALL
                .iter()
                .map(|r| (*r, alloc_of(allocation, *r) * (x / s)))
                .collect()
        }
    };
    let slope = (evaluate(base, &ray_point(next)) - evaluate(base, &ray_point(boundary))) / step.max(EPSILON);
    // Attribute the scalar segment slope to each resource proportionally to
    // its share of the current allocation, an approximation of the exact
    // partial derivatives of `base` along the current direction.
    if s <= EPSILON {
        return ResourceKind::ALL.iter().map(|r| (*r, slope / ResourceKind::ALL.len() as f64)).collect();
    }
    ResourceKind::ALL
        .iter()
        .map(|r| (*r, slope * alloc_of(allocation, *r) / s))
        .collect()
}
