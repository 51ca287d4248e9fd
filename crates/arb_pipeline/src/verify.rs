//! Pareto optimality verification (§4.7): a settled allocation is checked by
//! probing every agent pair for a one-unit transfer that would raise total
//! weighted welfare — the first-order condition of the water-filling
//! optimum is that weighted marginal utility is equalized across any two
//! agents who both hold room to give and receive a resource.

use std::collections::BTreeMap;

use arb_algo::UtilityEval;
use arb_core::agent::Agent;
use arb_core::resource::ResourceKind;
use arb_core::{AgentId, PARETO_EPSILON};

/// A candidate trade the probe found that would (to first order) raise
/// total weighted welfare without the allocation having been adjusted for
/// it — evidence the allocation is not yet optimal.
#[derive(Clone, Debug, PartialEq)]
pub struct ParetoViolation {
    pub resource: ResourceKind,
    pub giver: AgentId,
    pub receiver: AgentId,
    pub marginal_gain: f64,
}

/// Result of comparing this round's settled utilities against the prior
/// round's (§4.6 step 6, §4.7: "from round 2" onward). Absent on round 1,
/// when there is no prior round to compare against.
#[derive(Clone, Debug, PartialEq)]
pub struct InterRoundComparison {
    pub improved: bool,
    pub strictly_improved: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParetoReport {
    pub optimal: bool,
    pub violations: Vec<ParetoViolation>,
    pub inter_round: Option<InterRoundComparison>,
}

fn allocation_point(agent: &Agent) -> BTreeMap<ResourceKind, f64> {
    ResourceKind::ALL.into_iter().map(|k| (k, agent.allocated(k) as f64)).collect()
}

/// Each agent's own preference evaluated at its current settled allocation
/// (§4.6 step 6's utility snapshot) — the vector `is_pareto_improvement`/
/// `is_strict_pareto_improvement` compare round over round.
pub fn utility_vector(agents: &[Agent]) -> BTreeMap<AgentId, f64> {
    agents.iter().map(|a| (a.id.clone(), a.preferences.evaluate(&allocation_point(a)))).collect()
}

/// Probe every ordered agent pair, for every resource, for a one-unit
/// transfer from the first to the second that would raise the arbitration
/// objective `sum(w_i * ln(a_i))` (§4.5's own target, not each agent's own
/// possibly-nonlinear preference curve) by more than `PARETO_EPSILON` (§4.7's
/// Delta_i/Delta_j formula: `Delta_i = w_i*ln(a_i-1) - w_i*ln(a_i)` is the
/// giver's loss, `Delta_j = w_j*ln(a_j+1) - w_j*ln(a_j)` the receiver's gain;
/// the combined change `Delta_i + Delta_j` is the net welfare effect of the
/// transfer — positive means a strictly better allocation was available and
/// this one is not optimal). A transfer is only considered feasible when the
/// giver has more than its minimum and the receiver has room below its ideal
/// — the envelope the arbitrator itself is bound by.
pub fn verify_pareto_optimal(agents: &[Agent], weights: &BTreeMap<AgentId, f64>) -> ParetoReport {
    let mut violations = Vec::new();

    for giver in agents {
        let w_giver = weights.get(&giver.id).copied().unwrap_or(0.0);
        for receiver in agents {
            if giver.id == receiver.id {
                continue;
            }
            let w_receiver = weights.get(&receiver.id).copied().unwrap_or(0.0);
            for k in ResourceKind::ALL {
                let a_i = giver.allocated(k);
                if a_i == 0 || a_i <= giver.min_for(k) {
                    continue;
                }
                let a_j = receiver.allocated(k);
                if a_j >= receiver.ideal_for(k) {
                    continue;
                }
                let delta_i = w_giver * ((a_i - 1) as f64).ln() - w_giver * (a_i as f64).ln();
                let delta_j = w_receiver * ((a_j + 1) as f64).ln() - w_receiver * (a_j as f64).ln();
                let net = delta_i + delta_j;
                if net > PARETO_EPSILON {
                    violations.push(ParetoViolation {
                        resource: k,
                        giver: giver.id.clone(),
                        receiver: receiver.id.clone(),
                        marginal_gain: net,
                    });
                }
            }
        }
    }

    ParetoReport {
        optimal: violations.is_empty(),
        violations,
        inter_round: None,
    }
}

/// `sum(w_i * ln(max(u_i, eps)))`, the weighted proportional-fairness
/// welfare function the solver targets (§4.5).
pub fn welfare(agents: &[Agent], weights: &BTreeMap<AgentId, f64>) -> f64 {
    agents
        .iter()
        .map(|a| {
            let u = a.preferences.evaluate(&allocation_point(a)).max(arb_core::EPSILON);
            weights.get(&a.id).copied().unwrap_or(0.0) * u.ln()
        })
        .sum()
}

/// Gini coefficient of the agents' settled per-resource utility values —
/// 0 is perfectly equal, approaching 1 is maximally unequal.
pub fn gini_coefficient(agents: &[Agent]) -> f64 {
    let mut values: Vec<f64> = agents.iter().map(|a| a.preferences.evaluate(&allocation_point(a)).max(0.0)).collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted_sum: f64 = values.iter().enumerate().map(|(i, &v)| (i as f64 + 1.0) * v).sum();
    (2.0 * weighted_sum) / (n as f64 * total) - (n as f64 + 1.0) / n as f64
}

/// Whether `next` is a Pareto improvement over `prev`: every agent's
/// utility is at least as high, and at least one is strictly higher.
pub fn is_pareto_improvement(prev: &BTreeMap<AgentId, f64>, next: &BTreeMap<AgentId, f64>) -> bool {
    let mut strictly_better = false;
    for (id, &prev_u) in prev {
        let next_u = next.get(id).copied().unwrap_or(prev_u);
        if next_u < prev_u - PARETO_EPSILON {
            return false;
        }
        if next_u > prev_u + PARETO_EPSILON {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Whether `next` is a *strict* Pareto improvement over `prev`: every agent
/// present in `prev` is strictly better off, with no exceptions (§4.7) —
/// stronger than [`is_pareto_improvement`], which only asks that nobody
/// regress and at least one agent gain.
pub fn is_strict_pareto_improvement(prev: &BTreeMap<AgentId, f64>, next: &BTreeMap<AgentId, f64>) -> bool {
    prev.iter().all(|(id, &prev_u)| {
        let next_u = next.get(id).copied().unwrap_or(prev_u);
        next_u > prev_u + PARETO_EPSILON
    })
}
