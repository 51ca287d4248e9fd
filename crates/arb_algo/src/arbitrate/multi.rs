//! Multi-resource arbitration (§4.5): agents whose utility couples several
//! resources (CES, nested CES, Leontief, loss aversion…) can't be solved one
//! resource at a time independently, because each resource's water level
//! depends on marginal utilities that move as other resources' allocations
//! move. We iterate: price each contested resource by agents' current
//! marginal utility there, water-fill it, update, repeat — damped to
//! converge instead of oscillate — then integerize once at the end.

use std::collections::{BTreeMap, BTreeSet};

use arb_core::agent::Agent;
use arb_core::resource::ResourceKind;
use arb_core::{AgentId, FIXED_POINT_CONVERGENCE, FIXED_POINT_DAMPING, MAX_INNER_ITERATIONS};

use crate::arbitrate::single::water_fill_resource;
use crate::arbitrate::single::water_fill_resource_real;
use crate::utility::UtilityEval;

/// Per-resource integer allocations, one map per contested resource.
pub type MultiAllocation = BTreeMap<ResourceKind, BTreeMap<AgentId, u64>>;

/// The settled cross-resource allocation plus whether the damped fixed
/// point actually converged (§7 `IterationCap`): if not, `allocations` is
/// still the best-effort last iterate, integerized the same way, but
/// callers should surface that as a diagnostic rather than silently trust
/// it as a converged optimum.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiArbitrationOutcome {
    pub allocations: MultiAllocation,
    pub converged: bool,
    pub iterations: u32,
}

/// Jointly water-fill every resource in `contested`, honoring each agent's
/// full multi-resource utility gradient as the per-resource bid, until the
/// largest single-resource change between iterations falls below
/// `FIXED_POINT_CONVERGENCE` or `MAX_INNER_ITERATIONS` is reached.
pub fn arbitrate_multi_resource(
    agents: &[Agent],
    contested: &BTreeSet<ResourceKind>,
    weights: &BTreeMap<AgentId, f64>,
    capacities: &BTreeMap<ResourceKind, u64>,
) -> MultiArbitrationOutcome {
    if contested.is_empty() {
        return MultiArbitrationOutcome {
            allocations: BTreeMap::new(),
            converged: true,
            iterations: 0,
        };
    }

    // Resources outside `contested` are uncontested: agents get their ideal
    // there, fixed for the duration of the iteration.
    let fixed_point = |current: &BTreeMap<ResourceKind, BTreeMap<AgentId, f64>>, agent: &Agent| -> BTreeMap<ResourceKind, f64> {
        ResourceKind::ALL
            .into_iter()
            .map(|k| {
                let v = if contested.contains(&k) {
                    current.get(&k).and_then(|m| m.get(&agent.id)).copied().unwrap_or(0.0)
                } else {
                    agent.ideal_for(k) as f64
                };
                (k, v)
            })
            .collect()
    };

    let mut current: BTreeMap<ResourceKind, BTreeMap<AgentId, f64>> = contested
        .iter()
        .map(|&k| {
            let ideal: BTreeMap<AgentId, u64> =
                agents.iter().filter(|a| weights.contains_key(&a.id)).map(|a| (a.id.clone(), a.ideal_for(k))).collect();
            let min: BTreeMap<AgentId, u64> =
                agents.iter().filter(|a| weights.contains_key(&a.id)).map(|a| (a.id.clone(), a.min_for(k))).collect();
            let cap = capacities.get(&k).copied().unwrap_or(0);
            (k, water_fill_resource_real(weights, &min, &ideal, cap))
        })
        .collect();

    let mut converged = false;
    let mut iterations_run = 0u32;
    for iteration in 0..MAX_INNER_ITERATIONS {
        iterations_run = iteration + 1;
        let mut next: BTreeMap<ResourceKind, BTreeMap<AgentId, f64>> = BTreeMap::new();
        let mut max_delta = 0.0_f64;

        for &k in contested {
            let bids: BTreeMap<AgentId, f64> = agents
                .iter()
                .filter(|a| weights.contains_key(&a.id))
                .map(|agent| {
                    let point = fixed_point(&current, agent);
                    let grad = agent.preferences.gradient(&point);
                    let marginal = grad.get(&k).copied().unwrap_or(0.0);
                    let w = weights.get(&agent.id).copied().unwrap_or(0.0);
                    (agent.id.clone(), (w * marginal).max(0.0))
                })
                .collect();

            let min: BTreeMap<AgentId, u64> =
                agents.iter().filter(|a| weights.contains_key(&a.id)).map(|a| (a.id.clone(), a.min_for(k))).collect();
            let ideal: BTreeMap<AgentId, u64> =
                agents.iter().filter(|a| weights.contains_key(&a.id)).map(|a| (a.id.clone(), a.ideal_for(k))).collect();
            let cap = capacities.get(&k).copied().unwrap_or(0);

            let fresh = water_fill_resource_real(&bids, &min, &ideal, cap);
            let prev = current.get(&k).cloned().unwrap_or_default();

            let mut damped = BTreeMap::new();
            for id in fresh.keys().chain(prev.keys()).collect::<BTreeSet<_>>() {
                let f = fresh.get(id).copied().unwrap_or(0.0);
                let p = prev.get(id).copied().unwrap_or(0.0);
                let d = (1.0 - FIXED_POINT_DAMPING) * p + FIXED_POINT_DAMPING * f;
                max_delta = max_delta.max((d - p).abs());
                damped.insert(id.clone(), d);
            }
            next.insert(k, damped);
        }

        current = next;
        if max_delta < FIXED_POINT_CONVERGENCE {
            converged = true;
            break;
        }
    }

    let allocations = contested
        .iter()
        .map(|&k| {
            let min: BTreeMap<AgentId, u64> =
                agents.iter().filter(|a| weights.contains_key(&a.id)).map(|a| (a.id.clone(), a.min_for(k))).collect();
            let ideal: BTreeMap<AgentId, u64> =
                agents.iter().filter(|a| weights.contains_key(&a.id)).map(|a| (a.id.clone(), a.ideal_for(k))).collect();
            let cap = capacities.get(&k).copied().unwrap_or(0);
            // Re-run the single-resource solver at the converged (or, if the
            // cap was hit, the last-iterate) bid vector for an exact integer
            // water-fill + largest-remainder pass, rather than rounding the
            // damped reals directly.
            let bids: BTreeMap<AgentId, f64> = agents
                .iter()
                .filter(|a| weights.contains_key(&a.id))
                .map(|agent| {
                    let point = fixed_point(&current, agent);
                    let grad = agent.preferences.gradient(&point);
                    let marginal = grad.get(&k).copied().unwrap_or(0.0);
                    let w = weights.get(&agent.id).copied().unwrap_or(0.0);
                    (agent.id.clone(), (w * marginal).max(0.0))
                })
                .collect();
            (k, water_fill_resource(&bids, &min, &ideal, cap))
        })
        .collect();

    MultiArbitrationOutcome {
        allocations,
        converged,
        iterations: iterations_run,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arb_core::utility::UtilityForm;
    use rust_decimal::Decimal;

    fn agent(id: &str, ideal_compute: u64, ideal_mem: u64) -> Agent {
        let mut w = BTreeMap::new();
        w.insert(ResourceKind::Compute, 0.5);
        w.insert(ResourceKind::Memory, 0.5);
        let mut ideal = BTreeMap::new();
        ideal.insert(ResourceKind::Compute, ideal_compute);
        ideal.insert(ResourceKind::Memory, ideal_mem);
        Agent::new(
            AgentId::new(id).unwrap(),
            id,
            UtilityForm::cobb_douglas(w).unwrap(),
            BTreeMap::new(),
            ideal,
            Decimal::new(0, 0),
        )
        .unwrap()
    }

    #[test]
    fn converges_and_respects_capacity_on_each_resource() {
        let agents = vec![agent("a", 100, 100), agent("b", 100, 100)];
        let contested: BTreeSet<ResourceKind> = [ResourceKind::Compute, ResourceKind::Memory].into_iter().collect();
        let mut weights = BTreeMap::new();
        weights.insert(AgentId::new("a").unwrap(), 10.0);
        weights.insert(AgentId::new("b").unwrap(), 10.0);
        let mut capacities = BTreeMap::new();
        capacities.insert(ResourceKind::Compute, 50);
        capacities.insert(ResourceKind::Memory, 50);

        let out = arbitrate_multi_resource(&agents, &contested, &weights, &capacities);
        let compute_total: u64 = out.allocations[&ResourceKind::Compute].values().sum();
        let memory_total: u64 = out.allocations[&ResourceKind::Memory].values().sum();
        assert_eq!(compute_total, 50);
        assert_eq!(memory_total, 50);
        assert!(out.converged, "two symmetric agents should converge well within the iteration cap");
    }

    #[test]
    fn empty_contention_reports_converged_with_zero_iterations() {
        let out = arbitrate_multi_resource(&[], &BTreeSet::new(), &BTreeMap::new(), &BTreeMap::new());
        assert!(out.allocations.is_empty());
        assert!(out.converged);
        assert_eq!(out.iterations, 0);
    }
}
