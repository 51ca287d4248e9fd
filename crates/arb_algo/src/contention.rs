//! Contention detection (§4.3): group agents into connected components over
//! the agent/resource bipartite graph induced by oversubscribed resources,
//! and rank each group's severity.

use std::collections::{BTreeMap, BTreeSet};

use arb_core::agent::Agent;
use arb_core::pool::ResourcePool;
use arb_core::resource::ResourceKind;
use arb_core::AgentId;

/// A resource is contested in a round if the sum of agents' ideal requests
/// for it exceeds the pool's capacity.
pub fn contested_resources(agents: &[Agent], pool: &ResourcePool) -> BTreeSet<ResourceKind> {
    ResourceKind::ALL
        .into_iter()
        .filter(|&k| {
            let demand: u64 = agents.iter().map(|a| a.ideal_for(k)).sum();
            demand > pool.capacity(k)
        })
        .collect()
}

/// A maximal set of agents and resources connected through shared contested
/// resources, together with a severity score.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentionGroup {
    pub agents: BTreeSet<AgentId>,
    pub resources: BTreeSet<ResourceKind>,
    /// Highest demand/capacity ratio among this group's contested resources.
    pub severity: f64,
    /// `Sum(min) <= available` for every contested resource in this group
    /// (§4.3). `false` means the arbitrator will fall back to its
    /// best-effort proportional minimum split for at least one resource.
    pub feasible: bool,
    /// Resources whose aggregate minimum exceeds the pool's available
    /// quantity, naming the binding shortfall for diagnostics (§4.3, §7
    /// `InfeasibleContention`). Empty when `feasible` is `true`.
    pub infeasible_resources: BTreeSet<ResourceKind>,
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

/// Detect contention groups among `agents` for the current `pool` state.
/// Agents that share no contested resource, directly or transitively, fall
/// into separate groups (and agents touching no contested resource at all
/// are omitted entirely).
pub fn detect_contention(agents: &[Agent], pool: &ResourcePool) -> Vec<ContentionGroup> {
    let contested = contested_resources(agents, pool);
    if contested.is_empty() {
        return Vec::new();
    }

    // Node space: agents first, then contested resources, each given a dense index.
    let resource_list: Vec<ResourceKind> = contested.iter().copied().collect();
    let resource_index: BTreeMap<ResourceKind, usize> =
        resource_list.iter().enumerate().map(|(i, &k)| (k, agents.len() + i)).collect();

    let mut uf = UnionFind::new(agents.len() + resource_list.len());
    for (i, agent) in agents.iter().enumerate() {
        for k in agent.requested_resources() {
            if let Some(&ri) = resource_index.get(&k) {
                uf.union(i, ri);
            }
        }
    }

    let mut groups: BTreeMap<usize, ContentionGroup> = BTreeMap::new();
    for (i, agent) in agents.iter().enumerate() {
        let mut touches_contested = false;
        for k in agent.requested_resources() {
            if contested.contains(&k) {
                touches_contested = true;
            }
        }
        if !touches_contested {
            continue;
        }
        let root = uf.find(i);
        groups.entry(root).or_insert_with(|| ContentionGroup {
            agents: BTreeSet::new(),
            resources: BTreeSet::new(),
            severity: 0.0,
            feasible: true,
            infeasible_resources: BTreeSet::new(),
        });
        let g = groups.get_mut(&root).unwrap();
        g.agents.insert(agent.id.clone());
        for k in agent.requested_resources() {
            if contested.contains(&k) {
                g.resources.insert(k);
            }
        }
    }

    for group in groups.values_mut() {
        group.severity = group
            .resources
            .iter()
            .map(|&k| {
                let demand: u64 = agents
                    .iter()
                    .filter(|a| group.agents.contains(&a.id))
                    .map(|a| a.ideal_for(k))
                    .sum();
                let cap = pool.capacity(k).max(1);
                demand as f64 / cap as f64
            })
            .fold(0.0_f64, f64::max);

        let infeasible: BTreeSet<ResourceKind> = group
            .resources
            .iter()
            .copied()
            .filter(|&k| {
                let total_min: u64 = agents
                    .iter()
                    .filter(|a| group.agents.contains(&a.id))
                    .map(|a| a.min_for(k))
                    .sum();
                total_min > pool.available(k)
            })
            .collect();
        group.feasible = infeasible.is_empty();
        group.infeasible_resources = infeasible;
    }

    groups.into_values().collect()
}
