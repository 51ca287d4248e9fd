//! Pure, offline scenario summary model and JSON renderer (§4.8, §4.9). No
//! recomputation — every field is echoed from artifacts `arb_pipeline`
//! already produced; this crate only shapes and serializes them.

#![deny(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use arb_core::AgentId;
use arb_pipeline::RoundSnapshot;

/// One agent's standing as of the last recorded round: its final allocation,
/// utility, and cumulative utility across every round so far.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSummary {
    pub agent_id: AgentId,
    pub rounds_participated: u64,
    pub final_utility: f64,
    pub final_satisfaction: f64,
    pub cumulative_utility: f64,
}

/// The full summary of a scenario run: welfare at the final round, the Gini
/// coefficient of final utility, whether the final allocation passed Pareto
/// verification, and each agent's standing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioSummary {
    pub rounds_run: u64,
    pub pareto_optimal_final_round: bool,
    pub pareto_violation_count: usize,
    pub gini_final_round: f64,
    pub agents: Vec<AgentSummary>,
}

/// Build a summary from a round tracker's full history plus the last round's
/// Pareto report and Gini coefficient, which `arb_pipeline` computed and the
/// caller already has on hand from `RoundDriver::run_arbitration`.
pub fn build_summary(history: &[RoundSnapshot], pareto_optimal: bool, violation_count: usize, gini_final_round: f64) -> ScenarioSummary {
    let rounds_run = history.iter().map(|s| s.round).max().unwrap_or(0);

    let mut by_agent: BTreeMap<AgentId, Vec<&RoundSnapshot>> = BTreeMap::new();
    for snapshot in history {
        by_agent.entry(snapshot.agent_id.clone()).or_default().push(snapshot);
    }

    let agents = by_agent
        .into_iter()
        .map(|(agent_id, snapshots)| {
            let last = snapshots
                .iter()
                .max_by_key(|s| s.round)
                .expect("at least one snapshot per agent entry");
            AgentSummary {
                agent_id,
                rounds_participated: snapshots.len() as u64,
                final_utility: last.utility,
                final_satisfaction: last.satisfaction,
                cumulative_utility: last.cumulative_utility,
            }
        })
        .collect();

    ScenarioSummary {
        rounds_run,
        pareto_optimal_final_round: pareto_optimal,
        pareto_violation_count: violation_count,
        gini_final_round,
        agents,
    }
}

/// Render a summary as pretty-printed JSON, field order fixed by
/// `ScenarioSummary`'s own declaration order.
pub fn render_json(summary: &ScenarioSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use arb_core::resource::ResourceKind;

    fn snapshot(agent: &str, round: u64, utility: f64, cumulative: f64) -> RoundSnapshot {
        RoundSnapshot {
            round,
            agent_id: AgentId::new(agent).unwrap(),
            strategy: "zero".to_string(),
            allocation: BTreeMap::from([(ResourceKind::Compute, 10)]),
            utility,
            currency_before: Decimal::ZERO,
            currency_burned: Decimal::ZERO,
            currency_after: Decimal::ZERO,
            satisfaction: 0.5,
            cumulative_utility: cumulative,
        }
    }

    #[test]
    fn summarizes_the_latest_round_per_agent() {
        let history = vec![
            snapshot("a", 1, 5.0, 5.0),
            snapshot("a", 2, 6.0, 11.0),
            snapshot("b", 1, 4.0, 4.0),
        ];
        let summary = build_summary(&history, true, 0, 0.1);
        assert_eq!(summary.rounds_run, 2);
        assert_eq!(summary.agents.len(), 2);
        let a = summary.agents.iter().find(|s| s.agent_id.as_str() == "a").unwrap();
        assert_eq!(a.rounds_participated, 2);
        assert_eq!(a.final_utility, 6.0);
        assert_eq!(a.cumulative_utility, 11.0);
    }

    #[test]
    fn renders_valid_json() {
        let summary = build_summary(&[snapshot("a", 1, 1.0, 1.0)], false, 2, 0.3);
        let json = render_json(&summary).unwrap();
        assert!(json.contains("\"pareto_violation_count\": 2"));
    }
}
