//! Longitudinal per-agent history (§4.8): an append-only record of every
//! settled round, used for CSV export and the report's cumulative-utility
//! view.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use arb_algo::UtilityEval;
use arb_core::agent::Agent;
use arb_core::resource::ResourceKind;
use arb_core::AgentId;

#[derive(Clone, Debug, PartialEq)]
pub struct RoundSnapshot {
    pub round: u64,
    pub agent_id: AgentId,
    pub strategy: String,
    pub allocation: BTreeMap<ResourceKind, u64>,
    pub utility: f64,
    pub currency_before: Decimal,
    pub currency_burned: Decimal,
    pub currency_after: Decimal,
    /// `utility / utility-at-ideal-request`, clamped to `[0, 1]`; 1.0 means
    /// the agent received exactly as much value as its unconstrained ideal
    /// would have given it.
    pub satisfaction: f64,
    pub cumulative_utility: f64,
}

/// Append-only store of every round's settlement, keyed by round then by
/// agent id for deterministic emission order.
#[derive(Default)]
pub struct RoundTracker {
    history: Vec<RoundSnapshot>,
    cumulative: BTreeMap<AgentId, f64>,
}

impl RoundTracker {
    pub fn new() -> Self {
        RoundTracker::default()
    }

    /// Record one agent's settlement for `round`. `currency_before` and
    /// `currency_burned` come from the priority economy step that preceded
    /// the solver; `agent`'s allocation and balance reflect the post-solve
    /// state.
    pub fn record(
        &mut self,
        round: u64,
        agent: &Agent,
        strategy: impl Into<String>,
        currency_before: Decimal,
        currency_burned: Decimal,
    ) -> &RoundSnapshot {
        let allocation: BTreeMap<ResourceKind, u64> = ResourceKind::ALL.into_iter().map(|k| (k, agent.allocated(k))).collect();
        let point: BTreeMap<ResourceKind, f64> = allocation.iter().map(|(&k, &v)| (k, v as f64)).collect();
        let utility = agent.preferences.evaluate(&point);

        let ideal_point: BTreeMap<ResourceKind, f64> = ResourceKind::ALL.into_iter().map(|k| (k, agent.ideal_for(k) as f64)).collect();
        let ideal_utility = agent.preferences.evaluate(&ideal_point);
        let satisfaction = if ideal_utility.abs() > arb_core::EPSILON {
            (utility / ideal_utility).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let cumulative = self.cumulative.entry(agent.id.clone()).or_insert(0.0);
        *cumulative += utility;

        self.history.push(RoundSnapshot {
            round,
            agent_id: agent.id.clone(),
            strategy: strategy.into(),
            allocation,
            utility,
            currency_before,
            currency_burned,
            currency_after: agent.balance,
            satisfaction,
            cumulative_utility: *cumulative,
        });
        self.history.last().unwrap()
    }

    pub fn history(&self) -> &[RoundSnapshot] {
        &self.history
    }

    pub fn history_for<'a>(&'a self, agent_id: &'a AgentId) -> impl Iterator<Item = &'a RoundSnapshot> + 'a {
        self.history.iter().filter(move |s| &s.agent_id == agent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arb_core::utility::UtilityForm;

    fn agent() -> Agent {
        let mut w = BTreeMap::new();
        w.insert(ResourceKind::Compute, 1.0);
        let mut ideal = BTreeMap::new();
        ideal.insert(ResourceKind::Compute, 10);
        let mut a = Agent::new(
            AgentId::new("a").unwrap(),
            "a",
            UtilityForm::linear(w, 0.0).unwrap(),
            BTreeMap::new(),
            ideal,
            Decimal::new(50, 0),
        )
        .unwrap();
        a.set_allocation(ResourceKind::Compute, 5);
        a
    }

    #[test]
    fn cumulative_utility_accumulates_across_rounds() {
        let mut tracker = RoundTracker::new();
        let a = agent();
        tracker.record(1, &a, "zero", Decimal::new(50, 0), Decimal::ZERO);
        tracker.record(2, &a, "zero", Decimal::new(50, 0), Decimal::ZERO);
        let history: Vec<_> = tracker.history_for(&a.id).collect();
        assert_eq!(history.len(), 2);
        assert!(history[1].cumulative_utility > history[0].cumulative_utility);
    }

    #[test]
    fn satisfaction_reflects_share_of_ideal_utility() {
        let mut tracker = RoundTracker::new();
        let a = agent();
        let snap = tracker.record(1, &a, "zero", Decimal::new(50, 0), Decimal::ZERO);
        assert!((snap.satisfaction - 0.5).abs() < 1e-9);
    }
}
