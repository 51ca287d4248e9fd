//! Agent data model (§3 `Agent`).

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::MIN_BALANCE;
use crate::errors::CoreError;
use crate::ids::AgentId;
use crate::resource::ResourceKind;
use crate::utility::UtilityForm;

/// A participant in the arbitration economy: its identity, utility function,
/// per-resource request envelope, currency balance, and last-settled
/// allocation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub preferences: UtilityForm,
    pub min_request: BTreeMap<ResourceKind, u64>,
    pub ideal_request: BTreeMap<ResourceKind, u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub allocation: BTreeMap<ResourceKind, u64>,
    pub balance: Decimal,
}

impl Agent {
    /// Construct and validate an agent per §3's invariants: `0 <= min[k] <=
    /// ideal[k]` for every resource named in either map, and `balance >=
    /// MIN_BALANCE`.
    pub fn new(
        id: AgentId,
        name: impl Into<String>,
        preferences: UtilityForm,
        min_request: BTreeMap<ResourceKind, u64>,
        ideal_request: BTreeMap<ResourceKind, u64>,
        balance: Decimal,
    ) -> Result<Self, CoreError> {
        let balance_f64 = balance.to_f64().unwrap_or(f64::NAN);
        if !(balance_f64.is_finite()) || balance_f64 < MIN_BALANCE {
            return Err(CoreError::BalanceBelowFloor {
                balance: balance_f64,
                floor: MIN_BALANCE,
            });
        }
        for (resource, &min) in &min_request {
            let ideal = ideal_request.get(resource).copied().unwrap_or(0);
            if min > ideal {
                return Err(CoreError::MinExceedsIdeal {
                    resource: resource.as_str().to_string(),
                });
            }
        }
        Ok(Agent {
            id,
            name: name.into(),
            preferences,
            min_request,
            ideal_request,
            allocation: BTreeMap::new(),
            balance,
        })
    }

    pub fn min_for(&self, resource: ResourceKind) -> u64 {
        self.min_request.get(&resource).copied().unwrap_or(0)
    }

    pub fn ideal_for(&self, resource: ResourceKind) -> u64 {
        self.ideal_request.get(&resource).copied().unwrap_or(0)
    }

    pub fn allocated(&self, resource: ResourceKind) -> u64 {
        self.allocation.get(&resource).copied().unwrap_or(0)
    }

    pub fn set_allocation(&mut self, resource: ResourceKind, units: u64) {
        self.allocation.insert(resource, units);
    }

    /// A resource this agent has a nonzero ideal request for — the set of
    /// resources it is actively contesting.
    pub fn requested_resources(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        ResourceKind::ALL
            .into_iter()
            .filter(move |k| self.ideal_for(*k) > 0)
    }
}
