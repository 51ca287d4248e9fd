//! Largest-remainder integerization: take real-valued per-agent shares that
//! sum to (at most) a target and round them to whole units without losing
//! or inventing any, breaking ties deterministically by priority weight
//! then agent id.

use std::collections::BTreeMap;

use arb_core::determinism::cmp_weight_then_id;
use arb_core::AgentId;

/// Round `shares` (real-valued, each within its own `[min, ideal]` bound
/// already) down to whole units, then distribute the leftover units — the
/// gap between the sum of floors and `target` — one at a time to the
/// agent(s) with the largest fractional remainder, clamped by `ideal`.
/// Ties go to the higher-weight agent, then the lexicographically lower id
/// (§4.5 step 4).
pub fn largest_remainder(
    shares: &BTreeMap<AgentId, f64>,
    ideal: &BTreeMap<AgentId, u64>,
    weights: &BTreeMap<AgentId, f64>,
    target: u64,
) -> BTreeMap<AgentId, u64> {
    let mut floors: BTreeMap<AgentId, u64> = BTreeMap::new();
    let mut remainders: Vec<(AgentId, f64)> = Vec::new();

    for (id, &share) in shares {
        let cap = ideal.get(id).copied().unwrap_or(0);
        let floor = (share.floor().max(0.0) as u64).min(cap);
        floors.insert(id.clone(), floor);
        remainders.push((id.clone(), share - floor as f64));
    }

    let sum_floors: u64 = floors.values().sum();
    if sum_floors >= target {
        return floors;
    }
    let mut needed = target - sum_floors;

    remainders.sort_by(|(a_id, a_r), (b_id, b_r)| {
        b_r.partial_cmp(a_r).unwrap_or(std::cmp::Ordering::Equal).then_with(|| {
            let wa = weights.get(a_id).copied().unwrap_or(0.0);
            let wb = weights.get(b_id).copied().unwrap_or(0.0);
            cmp_weight_then_id(wa, a_id, wb, b_id)
        })
    });

    while needed > 0 {
        let mut progressed = false;
        for (id, _) in &remainders {
            if needed == 0 {
                break;
            }
            let cap = ideal.get(id).copied().unwrap_or(0);
            let current = floors.get(id).copied().unwrap_or(0);
            if current < cap {
                floors.insert(id.clone(), current + 1);
                needed -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    floors
}
