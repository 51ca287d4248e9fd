//! Resource pool data model (§4.2 `ResourcePool`): per-resource capacity and
//! the portion currently allocated out to agents.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::resource::ResourceKind;

/// Fixed per-round capacity for each resource kind, plus the units currently
/// handed out. `available(k) = capacity(k) - allocated(k)` always holds.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourcePool {
    capacity: BTreeMap<ResourceKind, u64>,
    allocated: BTreeMap<ResourceKind, u64>,
}

impl ResourcePool {
    pub fn new(capacity: BTreeMap<ResourceKind, u64>) -> Self {
        ResourcePool {
            capacity,
            allocated: BTreeMap::new(),
        }
    }

    /// Rebuild a pool from a capacity/allocated pair, validating
    /// `allocated[k] <= capacity[k]` for every resource (§4.2).
    pub fn from_state(
        capacity: BTreeMap<ResourceKind, u64>,
        allocated: BTreeMap<ResourceKind, u64>,
    ) -> Result<Self, CoreError> {
        for (resource, &used) in &allocated {
            let cap = capacity.get(resource).copied().unwrap_or(0);
            if used > cap {
                return Err(CoreError::InvalidPoolState {
                    resource: resource.as_str().to_string(),
                });
            }
        }
        Ok(ResourcePool { capacity, allocated })
    }

    pub fn capacity(&self, resource: ResourceKind) -> u64 {
        self.capacity.get(&resource).copied().unwrap_or(0)
    }

    pub fn allocated(&self, resource: ResourceKind) -> u64 {
        self.allocated.get(&resource).copied().unwrap_or(0)
    }

    pub fn available(&self, resource: ResourceKind) -> u64 {
        self.capacity(resource).saturating_sub(self.allocated(resource))
    }

    /// Hand out `units` of `resource`. Fails with `InvalidPoolState` rather
    /// than saturating if the pool does not have that much available.
    pub fn allocate(&mut self, resource: ResourceKind, units: u64) -> Result<(), CoreError> {
        let next = self.allocated(resource) + units;
        if next > self.capacity(resource) {
            return Err(CoreError::InvalidPoolState {
                resource: resource.as_str().to_string(),
            });
        }
        self.allocated.insert(resource, next);
        Ok(())
    }

    /// Return `units` of `resource` to the pool, clamped at zero.
    pub fn release(&mut self, resource: ResourceKind, units: u64) {
        let current = self.allocated(resource);
        self.allocated.insert(resource, current.saturating_sub(units));
    }

    /// Clear all outstanding allocations, restoring full capacity (used
    /// between rounds before a fresh arbitration run).
    pub fn reset(&mut self) {
        self.allocated.clear();
    }

    pub fn utilization(&self, resource: ResourceKind) -> f64 {
        let cap = self.capacity(resource);
        if cap == 0 {
            return 0.0;
        }
        self.allocated(resource) as f64 / cap as f64
    }

    pub fn utilization_overall(&self) -> f64 {
        let total_cap: u64 = ResourceKind::ALL.iter().map(|k| self.capacity(*k)).sum();
        if total_cap == 0 {
            return 0.0;
        }
        let total_used: u64 = ResourceKind::ALL.iter().map(|k| self.allocated(*k)).sum();
        total_used as f64 / total_cap as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> ResourcePool {
        let mut cap = BTreeMap::new();
        cap.insert(ResourceKind::Compute, 100);
        ResourcePool::new(cap)
    }

    #[test]
    fn available_tracks_allocated() {
        let mut p = pool();
        assert_eq!(p.available(ResourceKind::Compute), 100);
        p.allocate(ResourceKind::Compute, 40).unwrap();
        assert_eq!(p.available(ResourceKind::Compute), 60);
        p.release(ResourceKind::Compute, 10);
        assert_eq!(p.available(ResourceKind::Compute), 70);
    }

    #[test]
    fn allocate_past_capacity_fails() {
        let mut p = pool();
        assert!(p.allocate(ResourceKind::Compute, 200).is_err());
    }

    #[test]
    fn from_state_rejects_over_allocation() {
        let mut cap = BTreeMap::new();
        cap.insert(ResourceKind::Compute, 10);
        let mut used = BTreeMap::new();
        used.insert(ResourceKind::Compute, 20);
        assert!(ResourcePool::from_state(cap, used).is_err());
    }

    #[test]
    fn reset_restores_full_availability() {
        let mut p = pool();
        p.allocate(ResourceKind::Compute, 100).unwrap();
        assert_eq!(p.available(ResourceKind::Compute), 0);
        p.reset();
        assert_eq!(p.available(ResourceKind::Compute), 100);
    }
}
