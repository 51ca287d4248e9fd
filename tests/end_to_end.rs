//! End-to-end scenarios run through the public crate surface: build a pool
//! and a roster of agents, settle a round (or many), and check the settled
//! allocation against the literal expectations worked out by hand.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use arb_algo::UtilityEval;
use arb_core::agent::Agent;
use arb_core::resource::ResourceKind;
use arb_core::utility::UtilityForm;
use arb_core::AgentId;
use arb_pipeline::observer::NullObserver;
use arb_pipeline::round::{NeverBurn, RoundDriver};
use arb_pipeline::BurnStrategy;

fn linear_agent(id: &str, weight_resource: ResourceKind, min: u64, ideal: u64, balance: i64) -> Agent {
    let mut w = BTreeMap::new();
    w.insert(weight_resource, 1.0);
    let mut min_map = BTreeMap::new();
    if min > 0 {
        min_map.insert(weight_resource, min);
    }
    let mut ideal_map = BTreeMap::new();
    ideal_map.insert(weight_resource, ideal);
    Agent::new(
        AgentId::new(id).unwrap(),
        id,
        UtilityForm::linear(w, 0.0).unwrap(),
        min_map,
        ideal_map,
        Decimal::new(balance, 0),
    )
    .unwrap()
}

struct FixedBurn(BTreeMap<String, Decimal>);

impl BurnStrategy for FixedBurn {
    fn decide_burn(&mut self, agent: &Agent, _round: u64, _contention_ratio: f64) -> Decimal {
        self.0.get(agent.id.as_str()).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Scenario 1: three identical agents splitting a contested resource with
/// zero burns. The 100-unit pool can't cover 120 units of demand, so the
/// solver falls back to an even split with the remainder broken by id order.
#[test]
fn scenario_1_even_split_with_lower_id_tiebreak() {
    let mut capacity = BTreeMap::new();
    capacity.insert(ResourceKind::Compute, 100);
    capacity.insert(ResourceKind::ApiCredits, 50);
    capacity.insert(ResourceKind::Memory, 200);

    let mut driver = RoundDriver::new(capacity);
    for id in ["agent-1", "agent-2", "agent-3"] {
        driver.register(linear_agent(id, ResourceKind::Compute, 10, 40, 100)).unwrap();
    }

    let mut strategy = NeverBurn;
    let mut observer = NullObserver;
    let report = driver.run_arbitration(&mut strategy, &mut observer).unwrap();
    assert!(report.optimal);

    let mut totals: BTreeMap<ResourceKind, u64> = BTreeMap::new();
    for agent in driver.agents() {
        let compute = agent.allocated(ResourceKind::Compute);
        assert!(compute == 33 || compute == 34, "agent {} got {compute}", agent.id);
        *totals.entry(ResourceKind::Compute).or_default() += compute;
    }
    assert_eq!(totals[&ResourceKind::Compute], 100);

    // MEMORY and API_CREDITS are uncontested: every agent's ideal (0, since
    // these agents only requested COMPUTE) is handed out in full.
    for agent in driver.agents() {
        assert_eq!(agent.allocated(ResourceKind::ApiCredits), 0);
        assert_eq!(agent.allocated(ResourceKind::Memory), 0);
    }
}

/// Scenario 2: two agents splitting 10 units of API_CREDITS under
/// lopsided burn-driven priorities (100 vs 10 above the base weight, so
/// weights 110 vs 20). Neither agent's ideal request binds, so the water
/// level settles at lambda=13 and the continuous shares (110/13, 20/13)
/// round to 8/2 by largest remainder.
#[test]
fn scenario_2_priority_skew_shapes_the_split() {
    let mut capacity = BTreeMap::new();
    capacity.insert(ResourceKind::ApiCredits, 10);

    let mut driver = RoundDriver::new(capacity);
    driver.register(linear_agent("agent-a", ResourceKind::ApiCredits, 0, 100, 1000)).unwrap();
    driver.register(linear_agent("agent-b", ResourceKind::ApiCredits, 0, 100, 1000)).unwrap();

    let mut burns = BTreeMap::new();
    burns.insert("agent-a".to_string(), Decimal::new(100, 0));
    burns.insert("agent-b".to_string(), Decimal::new(10, 0));
    let mut strategy = FixedBurn(burns);
    let mut observer = NullObserver;
    driver.run_arbitration(&mut strategy, &mut observer).unwrap();

    let a = driver.agents().find(|a| a.id.as_str() == "agent-a").unwrap().allocated(ResourceKind::ApiCredits);
    let b = driver.agents().find(|a| a.id.as_str() == "agent-b").unwrap().allocated(ResourceKind::ApiCredits);
    assert_eq!(a + b, 10);
    assert_eq!(a, 8);
    assert_eq!(b, 2);
}

/// Scenario 3: five agents at descending priority sharing 10 units with
/// minimum 1 each. Starvation resistance guarantees every agent at least
/// its minimum; monotonicity guarantees higher priority never trails lower.
#[test]
fn scenario_3_starvation_resistance_and_monotonicity() {
    let mut capacity = BTreeMap::new();
    capacity.insert(ResourceKind::Compute, 10);

    let ids = ["p100", "p80", "p40", "p20", "p10"];
    let priorities = [100i64, 80, 40, 20, 10];

    let mut driver = RoundDriver::new(capacity);
    for id in ids {
        driver.register(linear_agent(id, ResourceKind::Compute, 1, 5, 1000)).unwrap();
    }

    let mut burns = BTreeMap::new();
    for (id, &p) in ids.iter().zip(priorities.iter()) {
        burns.insert(id.to_string(), Decimal::new(p, 0));
    }
    let mut strategy = FixedBurn(burns);
    let mut observer = NullObserver;
    driver.run_arbitration(&mut strategy, &mut observer).unwrap();

    let allocations: Vec<u64> = ids.iter().map(|id| driver.agents().find(|a| a.id.as_str() == *id).unwrap().allocated(ResourceKind::Compute)).collect();

    assert!(allocations.iter().all(|&a| a >= 1), "every agent must clear its minimum: {allocations:?}");
    assert_eq!(allocations.iter().sum::<u64>(), 10);
    for window in allocations.windows(2) {
        assert!(window[0] >= window[1], "higher priority must not trail lower priority: {allocations:?}");
    }
}

/// Scenario 4: a long-running simulation across several burn strategies.
/// At this scale the round-by-round Pareto verifier should pass the large
/// majority of rounds, and every agent should end up with positive
/// cumulative utility (nobody starves across 200 rounds of positive ideal
/// requests and a pool well above the per-round minimum).
#[test]
fn scenario_4_long_run_is_mostly_pareto_optimal_and_nobody_starves() {
    const ROUNDS: u64 = 200;

    let mut capacity = BTreeMap::new();
    capacity.insert(ResourceKind::Compute, 500);

    let mut driver = RoundDriver::new(capacity);
    let mut burns = BTreeMap::new();
    let strategy_burn = [0i64, 2, 5, 10];
    let mut id_index = 0usize;
    for (strategy_idx, &burn) in strategy_burn.iter().enumerate() {
        for agent_idx in 0..3 {
            let id = format!("s{strategy_idx}-a{agent_idx}");
            driver.register(linear_agent(&id, ResourceKind::Compute, 0, 50, 100)).unwrap();
            burns.insert(id, Decimal::new(burn, 0));
            id_index += 1;
        }
    }
    assert_eq!(id_index, 12);

    let mut strategy = FixedBurn(burns);
    let mut observer = NullObserver;

    let mut optimal_rounds = 0u64;
    for _ in 1..=ROUNDS {
        let report = driver.run_arbitration_with_earning(&mut strategy, &mut observer, Some(0.05)).unwrap();
        if report.optimal {
            optimal_rounds += 1;
        }
    }

    let optimal_fraction = optimal_rounds as f64 / ROUNDS as f64;
    assert!(optimal_fraction >= 0.95, "only {optimal_fraction:.3} of rounds were Pareto-optimal");

    for agent in driver.agents() {
        let last = driver
            .tracker()
            .history_for(&agent.id)
            .last()
            .expect("every agent ran every round");
        assert!(last.cumulative_utility > 0.0, "agent {} ended with non-positive cumulative utility", agent.id);
    }
}

/// Scenario 5: Cobb-Douglas utility, exact point comparisons against hand
/// computed values.
#[test]
fn scenario_5_cobb_douglas_point_values() {
    let mut weights = BTreeMap::new();
    weights.insert(ResourceKind::Compute, 0.5);
    weights.insert(ResourceKind::Memory, 0.3);
    weights.insert(ResourceKind::Storage, 0.2);
    let form = UtilityForm::cobb_douglas(weights).unwrap();

    let zero_memory_storage: BTreeMap<ResourceKind, f64> = [
        (ResourceKind::Compute, 100.0),
        (ResourceKind::Memory, 0.0),
        (ResourceKind::Storage, 0.0),
    ]
    .into_iter()
    .collect();
    let utility_at_zero = form.evaluate(&zero_memory_storage);
    assert!(
        utility_at_zero.abs() < 1e-6,
        "Cobb-Douglas with any positively-weighted input at exactly zero must be exactly zero: {utility_at_zero}"
    );

    let balanced: BTreeMap<ResourceKind, f64> = [
        (ResourceKind::Compute, 50.0),
        (ResourceKind::Memory, 30.0),
        (ResourceKind::Storage, 20.0),
    ]
    .into_iter()
    .collect();
    let skewed: BTreeMap<ResourceKind, f64> = [
        (ResourceKind::Compute, 33.0),
        (ResourceKind::Memory, 33.0),
        (ResourceKind::Storage, 34.0),
    ]
    .into_iter()
    .collect();
    let utility_balanced = form.evaluate(&balanced);
    let utility_skewed = form.evaluate(&skewed);
    assert!(
        utility_balanced > utility_skewed,
        "allocation matching the agent's own weights should dominate an even split: {utility_balanced} vs {utility_skewed}"
    );
}

/// Scenario 6: CES with diminishing substitution prefers the balanced split
/// over the lopsided one at the same total.
#[test]
fn scenario_6_ces_prefers_balanced_allocation() {
    let mut weights = BTreeMap::new();
    weights.insert(ResourceKind::Compute, 0.5);
    weights.insert(ResourceKind::Storage, 0.5);
    let form = UtilityForm::ces(weights, 0.3).unwrap();

    let lopsided: BTreeMap<ResourceKind, f64> =
        [(ResourceKind::Compute, 80.0), (ResourceKind::Storage, 20.0)].into_iter().collect();
    let balanced: BTreeMap<ResourceKind, f64> =
        [(ResourceKind::Compute, 50.0), (ResourceKind::Storage, 50.0)].into_iter().collect();

    let utility_lopsided = form.evaluate(&lopsided);
    let utility_balanced = form.evaluate(&balanced);
    assert!(
        utility_balanced > utility_lopsided,
        "CES with rho < 1 must reward diminishing substitution: {utility_balanced} vs {utility_lopsided}"
    );
}
