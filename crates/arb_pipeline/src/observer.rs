//! Optional round-lifecycle hooks. Every method defaults to a no-op so a
//! caller only implements the events it cares about (metrics, UI updates,
//! audit trails); the driver itself only ever logs via the `log` facade.

use std::collections::BTreeMap;

use arb_core::resource::ResourceKind;
use arb_core::AgentId;

use arb_algo::ContentionGroup;

use crate::verify::{InterRoundComparison, ParetoReport};

pub trait RuntimeObserver {
    fn on_round_start(&mut self, _round: u64) {}

    fn on_contention_detected(&mut self, _round: u64, _resources: &[ResourceKind]) {}

    /// Called once per contention group whose aggregate minimums exceed
    /// available capacity for at least one resource (§4.3, §7
    /// `InfeasibleContention`). The arbitrator still settles these groups
    /// best-effort; this is purely a diagnostic hook.
    fn on_infeasible_contention(&mut self, _round: u64, _group: &ContentionGroup) {}

    fn on_allocation_settled(&mut self, _round: u64, _allocation: &BTreeMap<AgentId, BTreeMap<ResourceKind, u64>>) {}

    fn on_pareto_report(&mut self, _round: u64, _report: &ParetoReport) {}

    /// Called from round 2 onward with how this round's settled utilities
    /// compare to the previous round's (§4.6 step 6, §4.7). Not called on
    /// round 1, when there is no prior round to compare against.
    fn on_inter_round_comparison(&mut self, _round: u64, _comparison: &InterRoundComparison) {}

    fn on_round_end(&mut self, _round: u64) {}
}

/// The default observer: does nothing. Useful when a caller only wants the
/// driver's own `log` output.
#[derive(Default)]
pub struct NullObserver;

impl RuntimeObserver for NullObserver {}
