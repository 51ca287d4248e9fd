//! Execution budget (§4.8): once a round settles an agent's allocation, the
//! agent spends it against concrete service calls. Accounting is tight: a
//! failed `try_consume` still burns whatever remained, so a caller can never
//! retry its way into spending more than was allocated.

use std::collections::BTreeMap;
use std::fmt;

use arb_core::resource::ResourceKind;

/// A kind of service call an agent can make, each priced in units of one
/// underlying resource via the cost table it's registered against.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ServiceType {
    Inference,
    Storage,
    Bandwidth,
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceType::Inference => "inference",
            ServiceType::Storage => "storage",
            ServiceType::Bandwidth => "bandwidth",
        };
        write!(f, "{s}")
    }
}

/// Maps a service call to the resource and unit cost it draws from.
pub trait ServiceBackend {
    fn resource(&self) -> ResourceKind;
    fn unit_cost(&self) -> u64;
}

/// A fixed per-call cost against a single resource — the common case, and
/// the only backend this engine ships; callers needing tiered or
/// usage-scaled pricing implement `ServiceBackend` themselves.
pub struct FixedCostBackend {
    resource: ResourceKind,
    unit_cost: u64,
}

impl FixedCostBackend {
    pub fn new(resource: ResourceKind, unit_cost: u64) -> Self {
        FixedCostBackend { resource, unit_cost }
    }
}

impl ServiceBackend for FixedCostBackend {
    fn resource(&self) -> ResourceKind {
        self.resource
    }

    fn unit_cost(&self) -> u64 {
        self.unit_cost
    }
}

/// Reason a service call was refused: `requested` exceeded `available` for
/// `resource`. The budget has already been zeroed out for that resource by
/// the time this is returned.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("insufficient {resource} budget: requested {requested}, only {available} remained")]
pub struct InsufficientBudget {
    pub resource: ResourceKind,
    pub requested: u64,
    pub available: u64,
}

/// Tracks how much of a settled allocation an agent has left to spend this
/// round, per resource.
#[derive(Clone, Debug, Default)]
pub struct ExecutionBudget {
    remaining: BTreeMap<ResourceKind, u64>,
}

impl ExecutionBudget {
    pub fn from_allocation(allocation: &BTreeMap<ResourceKind, u64>) -> Self {
        ExecutionBudget {
            remaining: allocation.clone(),
        }
    }

    pub fn remaining(&self, resource: ResourceKind) -> u64 {
        self.remaining.get(&resource).copied().unwrap_or(0)
    }

    /// Whether `calls` against `backend` would fit without consuming
    /// anything. Pure query, no side effect.
    pub fn can_consume(&self, backend: &dyn ServiceBackend, calls: u64) -> bool {
        let cost = backend.unit_cost().saturating_mul(calls);
        self.remaining(backend.resource()) >= cost
    }

    /// Attempt `calls` service calls against `backend`. On success, deducts
    /// the exact cost. On failure, zeroes out the remaining budget for that
    /// resource — accounting is tight, partial consumption never silently
    /// lingers — and returns the shortfall as an error.
    pub fn try_consume(&mut self, backend: &dyn ServiceBackend, calls: u64) -> Result<(), InsufficientBudget> {
        let resource = backend.resource();
        let cost = backend.unit_cost().saturating_mul(calls);
        let have = self.remaining(resource);
        if have < cost {
            self.remaining.insert(resource, 0);
            return Err(InsufficientBudget { resource, requested: cost, available: have });
        }
        self.remaining.insert(resource, have - cost);
        Ok(())
    }

    pub fn is_exhausted(&self, resource: ResourceKind) -> bool {
        self.remaining(resource) == 0
    }

    /// A one-line human-readable rendering of what's left, one resource per
    /// entry, in `ResourceKind::ALL` order.
    pub fn summary(&self) -> String {
        ResourceKind::ALL
            .into_iter()
            .map(|k| format!("{k}={}", self.remaining(k)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A registry mapping each `ServiceType` to the backend it draws from,
/// consulted whenever a service invocation is requested (§4.8): insufficient
/// credits fail the call before the external backend would ever be invoked.
#[derive(Default)]
pub struct ServiceCostTable {
    backends: BTreeMap<ServiceType, Box<dyn ServiceBackend>>,
}

impl ServiceCostTable {
    pub fn new() -> Self {
        ServiceCostTable { backends: BTreeMap::new() }
    }

    pub fn register(&mut self, service: ServiceType, backend: Box<dyn ServiceBackend>) {
        self.backends.insert(service, backend);
    }

    /// Consult the cost table for `service` and attempt `calls` calls
    /// against `budget`. Returns `UnknownService` if nothing is registered
    /// for that service type.
    pub fn invoke_by_type(&self, budget: &mut ExecutionBudget, service: ServiceType, calls: u64) -> Result<(), ServiceInvocationError> {
        let backend = self.backends.get(&service).ok_or(ServiceInvocationError::UnknownService(service))?;
        budget.try_consume(backend.as_ref(), calls).map_err(ServiceInvocationError::Budget)
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceInvocationError {
    #[error("no cost-table entry registered for service type {0}")]
    UnknownService(ServiceType),
    #[error(transparent)]
    Budget(#[from] InsufficientBudget),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_within_budget_succeeds() {
        let mut alloc = BTreeMap::new();
        alloc.insert(ResourceKind::Compute, 100);
        let mut budget = ExecutionBudget::from_allocation(&alloc);
        let backend = FixedCostBackend::new(ResourceKind::Compute, 10);
        assert!(budget.try_consume(&backend, 5).is_ok());
        assert_eq!(budget.remaining(ResourceKind::Compute), 50);
    }

    #[test]
    fn consume_beyond_budget_fails_and_zeroes_the_remainder() {
        let mut alloc = BTreeMap::new();
        alloc.insert(ResourceKind::Compute, 30);
        let mut budget = ExecutionBudget::from_allocation(&alloc);
        let backend = FixedCostBackend::new(ResourceKind::Compute, 10);
        let err = budget.try_consume(&backend, 4).unwrap_err();
        assert_eq!(err, InsufficientBudget { resource: ResourceKind::Compute, requested: 40, available: 30 });
        assert_eq!(budget.remaining(ResourceKind::Compute), 0);
        assert!(budget.is_exhausted(ResourceKind::Compute));
    }

    #[test]
    fn can_consume_does_not_mutate_the_budget() {
        let mut alloc = BTreeMap::new();
        alloc.insert(ResourceKind::Compute, 30);
        let budget = ExecutionBudget::from_allocation(&alloc);
        let backend = FixedCostBackend::new(ResourceKind::Compute, 10);
        assert!(budget.can_consume(&backend, 3));
        assert!(!budget.can_consume(&backend, 4));
        assert_eq!(budget.remaining(ResourceKind::Compute), 30);
    }

    #[test]
    fn summary_lists_every_resource() {
        let mut alloc = BTreeMap::new();
        alloc.insert(ResourceKind::Compute, 5);
        let budget = ExecutionBudget::from_allocation(&alloc);
        let summary = budget.summary();
        assert!(summary.contains("COMPUTE=5"));
        assert!(summary.contains("MEMORY=0"));
    }

    #[test]
    fn cost_table_fails_closed_for_an_unregistered_service() {
        let mut alloc = BTreeMap::new();
        alloc.insert(ResourceKind::Compute, 5);
        let mut budget = ExecutionBudget::from_allocation(&alloc);
        let table = ServiceCostTable::new();
        let err = table.invoke_by_type(&mut budget, ServiceType::Inference, 1).unwrap_err();
        assert!(matches!(err, ServiceInvocationError::UnknownService(ServiceType::Inference)));
        assert_eq!(budget.remaining(ResourceKind::Compute), 5);
    }

    #[test]
    fn cost_table_consults_the_registered_backend() {
        let mut alloc = BTreeMap::new();
        alloc.insert(ResourceKind::Compute, 25);
        let mut budget = ExecutionBudget::from_allocation(&alloc);
        let mut table = ServiceCostTable::new();
        table.register(ServiceType::Inference, Box::new(FixedCostBackend::new(ResourceKind::Compute, 10)));

        assert!(table.invoke_by_type(&mut budget, ServiceType::Inference, 2).is_ok());
        assert_eq!(budget.remaining(ResourceKind::Compute), 5);

        let err = table.invoke_by_type(&mut budget, ServiceType::Inference, 1).unwrap_err();
        assert!(matches!(err, ServiceInvocationError::Budget(_)));
        assert_eq!(budget.remaining(ResourceKind::Compute), 0);
    }
}
