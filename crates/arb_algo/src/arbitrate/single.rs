//! Single-resource water-filling (§4.5 steps 1-5): maximize
//! `sum(w_i * ln(a_i))` subject to `min_i <= a_i <= ideal_i` and
//! `sum(a_i) <= capacity`, via bisection on the water level, then
//! integerized by largest remainder.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use arb_core::resource::ResourceKind;
use arb_core::AgentId;

use crate::integerize::largest_remainder;

const BISECTION_ITERATIONS: u32 = 64;

/// The settled outcome of arbitrating one resource for one contention
/// (§3 `AllocationResult`): the integer split, the weighted-log-utility
/// objective it achieves, whether the minima could be honored in full, a
/// human-readable diagnostic when they couldn't, and how long the solve
/// took. Infeasibility is data here, never a panic (§7).
#[derive(Clone, Debug, PartialEq)]
pub struct AllocationResult {
    pub resource: ResourceKind,
    pub allocation: BTreeMap<AgentId, u64>,
    pub objective: f64,
    pub feasible: bool,
    pub message: Option<String>,
    pub compute_time: Duration,
}

/// `sum(w_i * ln(max(a_i, 1)))`, guarded against non-finite results by
/// substituting `-inf` (§4.5 failure semantics, §7 `NumericGuard`).
fn objective_value(weights: &BTreeMap<AgentId, f64>, allocation: &BTreeMap<AgentId, u64>) -> f64 {
    let raw: f64 = allocation
        .iter()
        .map(|(id, &a)| {
            let w = weights.get(id).copied().unwrap_or(0.0);
            w * (a.max(1) as f64).ln()
        })
        .sum();
    if raw.is_finite() {
        raw
    } else {
        f64::NEG_INFINITY
    }
}

fn real_share(weight: f64, lambda: f64, min: f64, ideal: f64) -> f64 {
    if lambda <= 0.0 {
        return ideal;
    }
    (weight / lambda).clamp(min, ideal)
}

fn sum_at(lambda: f64, weights: &BTreeMap<AgentId, f64>, min: &BTreeMap<AgentId, u64>, ideal: &BTreeMap<AgentId, u64>) -> f64 {
    weights
        .iter()
        .map(|(id, &w)| {
            let m = min.get(id).copied().unwrap_or(0) as f64;
            let i = ideal.get(id).copied().unwrap_or(0) as f64;
            real_share(w, lambda, m, i)
        })
        .sum()
}

/// The continuous (pre-integerization) solution: each agent's real-valued
/// share under the water level that clears `capacity`, within `[min,
/// ideal]`. Exposed separately so the multi-resource fixed point (§4.5,
/// `arbitrate::multi`) can iterate on real shares without repeatedly
/// integerizing and re-fractionalizing between rounds.
pub fn water_fill_resource_real(
    weights: &BTreeMap<AgentId, f64>,
    min: &BTreeMap<AgentId, u64>,
    ideal: &BTreeMap<AgentId, u64>,
    capacity: u64,
) -> BTreeMap<AgentId, f64> {
    let ids: Vec<AgentId> = weights.keys().cloned().collect();
    if ids.is_empty() {
        return BTreeMap::new();
    }

    let total_ideal: u64 = ids.iter().map(|id| ideal.get(id).copied().unwrap_or(0)).sum();
    if total_ideal <= capacity {
        return ids
            .into_iter()
            .map(|id| {
                let v = ideal.get(&id).copied().unwrap_or(0) as f64;
                (id, v)
            })
            .collect();
    }

    let total_min: u64 = ids.iter().map(|id| min.get(id).copied().unwrap_or(0)).sum();
    if total_min >= capacity {
        let total_w: f64 = weights.values().sum();
        return if total_w > 0.0 {
            ids.iter()
                .map(|id| {
                    let w = weights.get(id).copied().unwrap_or(0.0);
                    (id.clone(), w / total_w * capacity as f64)
                })
                .collect()
        } else {
            let even = capacity as f64 / ids.len() as f64;
            ids.iter().map(|id| (id.clone(), even)).collect()
        };
    }

    let mut lo = 0.0_f64;
    let mut hi = {
        let max_w = weights.values().cloned().fold(0.0_f64, f64::max).max(1.0);
        let min_min = ids
            .iter()
            .map(|id| min.get(id).copied().unwrap_or(0))
            .filter(|&m| m > 0)
            .min()
            .unwrap_or(1) as f64;
        (max_w / min_min.max(1.0)) * 4.0 + 1.0
    };

    for _ in 0..BISECTION_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        if sum_at(mid, weights, min, ideal) > capacity as f64 {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let lambda = hi;
    ids.iter()
        .map(|id| {
            let w = weights.get(id).copied().unwrap_or(0.0);
            let m = min.get(id).copied().unwrap_or(0) as f64;
            let i = ideal.get(id).copied().unwrap_or(0) as f64;
            (id.clone(), real_share(w, lambda, m, i))
        })
        .collect()
}

/// Water-fill a single resource's `capacity` across the agents named in
/// `weights`, respecting each one's `[min, ideal]` request envelope, then
/// round to whole units by largest remainder. Agents with zero weight still
/// receive their `min` (everyone's floor is honored regardless of priority
/// economy standing).
pub fn water_fill_resource(
    weights: &BTreeMap<AgentId, f64>,
    min: &BTreeMap<AgentId, u64>,
    ideal: &BTreeMap<AgentId, u64>,
    capacity: u64,
) -> BTreeMap<AgentId, u64> {
    let shares = water_fill_resource_real(weights, min, ideal, capacity);
    largest_remainder(&shares, ideal, weights, capacity)
}

/// Like [`water_fill_resource`], but wraps the integer allocation in an
/// [`AllocationResult`] that reports feasibility, the objective value, and a
/// diagnostic naming the binding shortfall when `Sum(min) > capacity` (§4.5
/// step 1, §4.3, §7 `InfeasibleContention`). Degenerate all-zero weights are
/// replaced by a uniform weight before solving (§4.5 failure semantics).
pub fn water_fill_resource_checked(
    resource: ResourceKind,
    weights: &BTreeMap<AgentId, f64>,
    min: &BTreeMap<AgentId, u64>,
    ideal: &BTreeMap<AgentId, u64>,
    capacity: u64,
) -> AllocationResult {
    let start = Instant::now();

    let weights = if weights.values().all(|&w| w <= 0.0) && !weights.is_empty() {
        weights.keys().cloned().map(|id| (id, 1.0)).collect()
    } else {
        weights.clone()
    };

    let total_min: u64 = weights.keys().map(|id| min.get(id).copied().unwrap_or(0)).sum();
    let feasible = total_min <= capacity;

    let allocation = water_fill_resource(&weights, min, ideal, capacity);
    let objective = objective_value(&weights, &allocation);
    let message = if feasible {
        None
    } else {
        Some(format!(
            "aggregate minimum {total_min} exceeds available {capacity} for {resource}; allocated proportionally to weight/min ratio, shortfall {}",
            total_min - capacity
        ))
    };

    AllocationResult {
        resource,
        allocation,
        objective,
        feasible,
        message,
        compute_time: start.elapsed(),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn ids(n: usize) -> Vec<AgentId> {
        (0..n).map(|i| AgentId::new(format!("agent-{i:02}")).unwrap()).collect()
    }

    proptest! {
        /// Conservation (§8): the settled total never exceeds capacity, and
        /// equals it whenever aggregate ideal demand reaches capacity.
        #[test]
        fn conservation_never_exceeds_capacity(
            weights in prop::collection::vec(1.0..200.0f64, 1..6),
            ideals in prop::collection::vec(0u64..50, 1..6),
            capacity in 0u64..200,
        ) {
            let n = weights.len().min(ideals.len());
            let agent_ids = ids(n);
            let w: BTreeMap<AgentId, f64> = agent_ids.iter().cloned().zip(weights).collect();
            let ideal: BTreeMap<AgentId, u64> = agent_ids.iter().cloned().zip(ideals).collect();
            let out = water_fill_resource(&w, &BTreeMap::new(), &ideal, capacity);
            let total: u64 = out.values().sum();
            prop_assert!(total <= capacity);
            let total_ideal: u64 = ideal.values().sum();
            if total_ideal >= capacity {
                prop_assert_eq!(total, capacity);
            }
        }

        /// Minimum and cap respect (§8): every settled share sits within
        /// `[min, ideal]` whenever the group as a whole is feasible.
        #[test]
        fn settlement_respects_min_and_ideal_bounds(
            mins in prop::collection::vec(0u64..20, 2..5),
            extra_headroom in prop::collection::vec(0u64..30, 2..5),
            weights in prop::collection::vec(1.0..100.0f64, 2..5),
            capacity in 0u64..150,
        ) {
            let n = mins.len().min(extra_headroom.len()).min(weights.len());
            let agent_ids = ids(n);
            let min: BTreeMap<AgentId, u64> = agent_ids.iter().cloned().zip(mins.iter().cloned()).collect();
            let ideal: BTreeMap<AgentId, u64> = agent_ids
                .iter()
                .cloned()
                .zip(mins.iter().zip(extra_headroom.iter()).map(|(&m, &h)| m + h))
                .collect();
            let w: BTreeMap<AgentId, f64> = agent_ids.iter().cloned().zip(weights).collect();
            let total_min: u64 = min.values().sum();
            prop_assume!(total_min <= capacity);

            let out = water_fill_resource(&w, &min, &ideal, capacity);
            for id in &agent_ids {
                prop_assert!(out[id] >= min[id]);
                prop_assert!(out[id] <= ideal[id]);
            }
        }

        /// Monotonicity in burn (§8): raising one agent's weight while
        /// holding everyone else fixed never decreases its settled share.
        #[test]
        fn higher_weight_never_gets_less(
            base_weight in 1.0..50.0f64,
            bump in 0.0..200.0f64,
            other_weight in 1.0..50.0f64,
            capacity in 1u64..100,
        ) {
            let a = AgentId::new("a").unwrap();
            let b = AgentId::new("b").unwrap();
            let mut ideal = BTreeMap::new();
            ideal.insert(a.clone(), 1000);
            ideal.insert(b.clone(), 1000);

            let mut low = BTreeMap::new();
            low.insert(a.clone(), base_weight);
            low.insert(b.clone(), other_weight);
            let out_low = water_fill_resource(&low, &BTreeMap::new(), &ideal, capacity);

            let mut high = BTreeMap::new();
            high.insert(a.clone(), base_weight + bump);
            high.insert(b.clone(), other_weight);
            let out_high = water_fill_resource(&high, &BTreeMap::new(), &ideal, capacity);

            prop_assert!(out_high[&a] >= out_low[&a]);
        }

        /// Starvation resistance (§8): with uniform weights and enough
        /// supply for one unit per head, nobody with a positive ideal and
        /// zero minimum is shut out.
        #[test]
        fn starvation_resistance_with_enough_supply(
            n in 1usize..8,
        ) {
            let agent_ids = ids(n);
            let weights: BTreeMap<AgentId, f64> = agent_ids.iter().cloned().map(|id| (id, 10.0)).collect();
            let ideal: BTreeMap<AgentId, u64> = agent_ids.iter().cloned().map(|id| (id, 5)).collect();
            let out = water_fill_resource(&weights, &BTreeMap::new(), &ideal, n as u64);
            for id in &agent_ids {
                prop_assert!(out[id] >= 1);
            }
        }

        /// Determinism (§8): the same inputs, solved twice, produce the
        /// exact same allocation.
        #[test]
        fn same_inputs_produce_identical_allocations(
            weights in prop::collection::vec(1.0..200.0f64, 1..6),
            ideals in prop::collection::vec(0u64..50, 1..6),
            capacity in 0u64..200,
        ) {
            let n = weights.len().min(ideals.len());
            let agent_ids = ids(n);
            let w: BTreeMap<AgentId, f64> = agent_ids.iter().cloned().zip(weights).collect();
            let ideal: BTreeMap<AgentId, u64> = agent_ids.iter().cloned().zip(ideals).collect();
            let first = water_fill_resource(&w, &BTreeMap::new(), &ideal, capacity);
            let second = water_fill_resource(&w, &BTreeMap::new(), &ideal, capacity);
            prop_assert_eq!(first, second);
        }
    }
}
