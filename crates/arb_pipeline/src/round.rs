//! The round driver (§4, end to end): register agents against a resource
//! pool, then on each `run_arbitration` call burn currency into priority
//! weight, detect contention, solve, settle allocations, and verify.

use std::collections::BTreeMap;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use arb_algo::arbitrate::arbitrate_multi_resource;
use arb_algo::{apply_burn, contested_resources, detect_contention, priority_weight};
use arb_core::agent::Agent;
use arb_core::pool::ResourcePool;
use arb_core::resource::ResourceKind;
use arb_core::{AgentId, API_CREDITS_BASELINE};

use crate::observer::RuntimeObserver;
use crate::tracker::RoundTracker;
use crate::verify::{is_pareto_improvement, is_strict_pareto_improvement, utility_vector, verify_pareto_optimal, InterRoundComparison, ParetoReport};
use crate::PipelineError;

/// Decides how much currency an agent burns at the start of a round. Given
/// its own mutable state so a caller can implement adaptive strategies
/// (e.g. burn more when contention was high last round). `contention_ratio`
/// is this agent's contention group's severity this round (§4.3's
/// demand/available ratio), or `0.0` if the agent touches no contested
/// resource this round (§6 strategy collaborator interface).
pub trait BurnStrategy {
    fn decide_burn(&mut self, agent: &Agent, round: u64, contention_ratio: f64) -> Decimal;
}

/// Never burns. The baseline strategy: every agent keeps `BASE_WEIGHT`.
pub struct NeverBurn;

impl BurnStrategy for NeverBurn {
    fn decide_burn(&mut self, _agent: &Agent, _round: u64, _contention_ratio: f64) -> Decimal {
        Decimal::ZERO
    }
}

pub struct RoundDriver {
    agents: BTreeMap<AgentId, Agent>,
    pool: ResourcePool,
    round: u64,
    tracker: RoundTracker,
    last_allocation: Option<BTreeMap<AgentId, BTreeMap<ResourceKind, u64>>>,
    last_utilities: Option<BTreeMap<AgentId, f64>>,
    checkpoint_approved: bool,
}

impl RoundDriver {
    pub fn new(capacity: BTreeMap<ResourceKind, u64>) -> Self {
        RoundDriver {
            agents: BTreeMap::new(),
            pool: ResourcePool::new(capacity),
            round: 0,
            tracker: RoundTracker::new(),
            last_allocation: None,
            last_utilities: None,
            checkpoint_approved: false,
        }
    }

    pub fn register(&mut self, agent: Agent) -> Result<(), PipelineError> {
        if self.agents.contains_key(&agent.id) {
            return Err(PipelineError::DuplicateAgent(agent.id.clone()));
        }
        self.agents.insert(agent.id.clone(), agent);
        Ok(())
    }

    pub fn unregister(&mut self, id: &AgentId) -> Result<Agent, PipelineError> {
        self.agents.remove(id).ok_or_else(|| PipelineError::UnknownAgent(id.clone()))
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn has_allocations(&self) -> bool {
        self.last_allocation.is_some()
    }

    pub fn allocations(&self) -> Option<&BTreeMap<AgentId, BTreeMap<ResourceKind, u64>>> {
        self.last_allocation.as_ref()
    }

    pub fn clear_allocations(&mut self) {
        self.last_allocation = None;
        self.pool.reset();
        self.checkpoint_approved = false;
    }

    pub fn tracker(&self) -> &RoundTracker {
        &self.tracker
    }

    /// Freeze the current round's allocation as approved: a caller-visible
    /// checkpoint used to gate committing service spend against it. Can
    /// only be called once per round's allocation.
    pub fn approve_checkpoint(&mut self) -> Result<(), PipelineError> {
        if self.last_allocation.is_none() {
            return Err(PipelineError::NoAllocationYet);
        }
        if self.checkpoint_approved {
            return Err(PipelineError::CheckpointAlreadyApproved);
        }
        self.checkpoint_approved = true;
        Ok(())
    }

    pub fn checkpoint_approved(&self) -> bool {
        self.checkpoint_approved
    }

    /// Run one full round: burn currency, detect contention, solve, settle,
    /// verify. Resources with no contention this round hand every agent
    /// its full ideal request (plus a baseline API-credits allotment of
    /// `API_CREDITS_BASELINE` when an agent never specified one). No
    /// currency is earned back this round.
    pub fn run_arbitration(
        &mut self,
        burn_strategy: &mut dyn BurnStrategy,
        observer: &mut dyn RuntimeObserver,
    ) -> Result<ParetoReport, PipelineError> {
        self.run_arbitration_with_earning(burn_strategy, observer, None)
    }

    /// Same as [`run_arbitration`](Self::run_arbitration), crediting each
    /// agent `earning_rate * units_allocated` (summed across resources) back
    /// onto its balance after settlement (§4.6 step 5). The rate is supplied
    /// by the caller; the round driver has no opinion on its source.
    pub fn run_arbitration_with_earning(
        &mut self,
        burn_strategy: &mut dyn BurnStrategy,
        observer: &mut dyn RuntimeObserver,
        earning_rate: Option<f64>,
    ) -> Result<ParetoReport, PipelineError> {
        self.round += 1;
        self.pool.reset();
        log::debug!("round {} starting with {} agents", self.round, self.agents.len());
        observer.on_round_start(self.round);

        let agent_list: Vec<Agent> = self.agents.values().cloned().collect();
        let contested = contested_resources(&agent_list, &self.pool);
        if !contested.is_empty() {
            log::debug!("round {} contention on {:?}", self.round, contested);
        }
        observer.on_contention_detected(self.round, &contested.iter().copied().collect::<Vec<_>>());

        let mut contention_ratio: BTreeMap<AgentId, f64> = BTreeMap::new();
        for group in detect_contention(&agent_list, &self.pool) {
            if !group.feasible {
                log::warn!(
                    "round {} contention group over {:?} is infeasible: minimums exceed capacity for {:?}",
                    self.round,
                    group.resources,
                    group.infeasible_resources
                );
                observer.on_infeasible_contention(self.round, &group);
            }
            for id in &group.agents {
                contention_ratio.insert(id.clone(), group.severity);
            }
        }

        let mut weights: BTreeMap<AgentId, f64> = BTreeMap::new();
        let mut burns: BTreeMap<AgentId, (Decimal, Decimal)> = BTreeMap::new();
        for id in self.agents.keys().cloned().collect::<Vec<_>>() {
            let agent = self.agents.get_mut(&id).expect("known id");
            let before = agent.balance;
            let ratio = contention_ratio.get(&id).copied().unwrap_or(0.0);
            let desired = burn_strategy.decide_burn(agent, self.round, ratio);
            let burned = apply_burn(agent, desired);
            weights.insert(id.clone(), priority_weight(burned));
            burns.insert(id, (before, burned));
        }

        let mut capacities: BTreeMap<ResourceKind, u64> = BTreeMap::new();
        for k in ResourceKind::ALL {
            capacities.insert(k, self.pool.capacity(k));
        }

        let mut settled: BTreeMap<ResourceKind, BTreeMap<AgentId, u64>> = BTreeMap::new();
        for k in ResourceKind::ALL {
            if contested.contains(&k) {
                continue;
            }
            let mut per_agent = BTreeMap::new();
            for agent in self.agents.values() {
                let mut units = agent.ideal_for(k);
                if k == ResourceKind::ApiCredits && !agent.ideal_request.contains_key(&k) {
                    units = API_CREDITS_BASELINE;
                }
                per_agent.insert(agent.id.clone(), units);
            }
            settled.insert(k, per_agent);
        }
        if !contested.is_empty() {
            let multi = arbitrate_multi_resource(&agent_list, &contested, &weights, &capacities);
            if !multi.converged {
                log::warn!(
                    "round {} multi-resource fixed point non-converged after {} iterations over {:?}",
                    self.round,
                    multi.iterations,
                    contested
                );
            }
            settled.extend(multi.allocations);
        }

        for (k, per_agent) in &settled {
            for (id, &units) in per_agent {
                if let Some(agent) = self.agents.get_mut(id) {
                    agent.set_allocation(*k, units);
                }
            }
            let total: u64 = per_agent.values().sum();
            self.pool.allocate(*k, total).map_err(PipelineError::Core)?;
        }

        if let Some(rate) = earning_rate {
            for agent in self.agents.values_mut() {
                let units: u64 = ResourceKind::ALL.into_iter().map(|k| agent.allocated(k)).sum();
                let earned = Decimal::from_f64(rate * units as f64).unwrap_or(Decimal::ZERO);
                agent.balance += earned;
            }
        }

        let mut allocation_out: BTreeMap<AgentId, BTreeMap<ResourceKind, u64>> = BTreeMap::new();
        for agent in self.agents.values() {
            let (before, burned) = burns.get(&agent.id).copied().unwrap_or((agent.balance, Decimal::ZERO));
            self.tracker.record(self.round, agent, "configured", before, burned);
            let per_resource: BTreeMap<ResourceKind, u64> = ResourceKind::ALL.into_iter().map(|k| (k, agent.allocated(k))).collect();
            allocation_out.insert(agent.id.clone(), per_resource);
        }
        observer.on_allocation_settled(self.round, &allocation_out);
        self.last_allocation = Some(allocation_out);
        self.checkpoint_approved = false;

        let final_agents: Vec<Agent> = self.agents.values().cloned().collect();
        let mut report = verify_pareto_optimal(&final_agents, &weights);
        if !report.optimal {
            log::warn!("round {} settled with {} Pareto violation(s)", self.round, report.violations.len());
        }

        // §4.6 step 6 / §4.7: from round 2 onward, also check this round's
        // settled utilities against the prior round's.
        let current_utilities = utility_vector(&final_agents);
        if self.round >= 2 {
            if let Some(prev) = &self.last_utilities {
                let comparison = InterRoundComparison {
                    improved: is_pareto_improvement(prev, &current_utilities),
                    strictly_improved: is_strict_pareto_improvement(prev, &current_utilities),
                };
                if !comparison.improved {
                    log::warn!("round {} is not a Pareto improvement over round {}", self.round, self.round - 1);
                }
                observer.on_inter_round_comparison(self.round, &comparison);
                report.inter_round = Some(comparison);
            }
        }
        self.last_utilities = Some(current_utilities);

        observer.on_pareto_report(self.round, &report);
        observer.on_round_end(self.round);

        Ok(report)
    }
}
