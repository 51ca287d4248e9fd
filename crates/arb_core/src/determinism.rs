//! Stable ordering helpers (§5 "Ordering guarantee").
//!
//! All tie-breaks in this engine are deterministic — there is no random tie
//! policy: every contest is broken by "higher priority weight, then lower
//! agent id".

use std::cmp::Ordering;

use crate::ids::AgentId;

/// Compare two agents for a tie-break: higher weight wins; ties broken by
/// lexicographically lower id (§4.5 step 4, §8 determinism).
pub fn cmp_weight_then_id(a_weight: f64, a_id: &AgentId, b_weight: f64, b_id: &AgentId) -> Ordering {
    match b_weight.partial_cmp(&a_weight) {
        Some(Ordering::Equal) | None => a_id.cmp(b_id),
        Some(ord) => ord,
    }
}

/// Sort agent ids ascending (lexicographic) — used wherever iteration order
/// must be fixed for deterministic snapshot emission (§5).
pub fn sort_agent_ids(ids: &mut [AgentId]) {
    ids.sort();
}
