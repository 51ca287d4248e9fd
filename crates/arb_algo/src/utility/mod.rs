//! Utility evaluation (§4.1): `evaluate`, `gradient`, and `linearize` for the
//! closed [`arb_core::UtilityForm`] family. The data enum lives in `arb_core`;
//! this module implements the only trait that matters over it, keeping the
//! data model computation-free and the algorithms in a separate crate.

mod elasticity;
mod forms;

use std::collections::BTreeMap;

use arb_core::resource::ResourceKind;
use arb_core::utility::UtilityForm;

pub use elasticity::{elasticity_of_substitution, marginal_rate_of_substitution};

/// A utility value together with its gradient at the point it was evaluated,
/// i.e. the local affine (first-order) approximation used by the
/// water-filling solver to rank marginal allocations.
#[derive(Clone, Debug, PartialEq)]
pub struct MarginalUtility {
    pub value: f64,
    pub gradient: BTreeMap<ResourceKind, f64>,
}

/// Evaluation surface every member of the closed utility family supports.
pub trait UtilityEval {
    /// Total utility at the given allocation (units per resource, as reals
    /// for solver purposes — callers round to integers separately).
    fn evaluate(&self, allocation: &BTreeMap<ResourceKind, f64>) -> f64;

    /// Partial derivative of utility with respect to each resource's
    /// allocation, at the given point.
    fn gradient(&self, allocation: &BTreeMap<ResourceKind, f64>) -> BTreeMap<ResourceKind, f64>;

    /// Bundle of `evaluate` + `gradient`, the first-order approximation the
    /// solver consumes when ranking the next unit to hand out.
    fn linearize(&self, allocation: &BTreeMap<ResourceKind, f64>) -> MarginalUtility {
        MarginalUtility {
            value: self.evaluate(allocation),
            gradient: self.gradient(allocation),
        }
    }

    /// Whether this form is strictly concave (safe for water-filling's
    /// diminishing-marginal-value assumption) or only quasi-concave
    /// (Leontief, whose marginal value is a subgradient, not a gradient).
    fn is_convex_compatible(&self) -> bool;

    /// Marginal rate of substitution of `j` for `i`: how many units of `j`
    /// compensate for losing one unit of `i` at the current allocation,
    /// `gradient[i] / gradient[j]` (§4.1).
    fn marginal_rate_of_substitution(&self, allocation: &BTreeMap<ResourceKind, f64>, i: ResourceKind, j: ResourceKind) -> f64;

    /// Elasticity of substitution between `i` and `j`: analytic for
    /// Linear/Leontief/Cobb-Douglas/CES, a one-sided numerical difference
    /// for every other variant (§4.1).
    fn elasticity_of_substitution(&self, allocation: &BTreeMap<ResourceKind, f64>, i: ResourceKind, j: ResourceKind) -> f64;
}

impl UtilityEval for UtilityForm {
    fn evaluate(&self, allocation: &BTreeMap<ResourceKind, f64>) -> f64 {
        forms::evaluate(self, allocation)
    }

    fn gradient(&self, allocation: &BTreeMap<ResourceKind, f64>) -> BTreeMap<ResourceKind, f64> {
        forms::gradient(self, allocation)
    }

    fn is_convex_compatible(&self) -> bool {
        UtilityForm::is_convex_compatible(self)
    }

    fn marginal_rate_of_substitution(&self, allocation: &BTreeMap<ResourceKind, f64>, i: ResourceKind, j: ResourceKind) -> f64 {
        elasticity::marginal_rate_of_substitution(self, allocation, i, j)
    }

    fn elasticity_of_substitution(&self, allocation: &BTreeMap<ResourceKind, f64>, i: ResourceKind, j: ResourceKind) -> f64 {
        elasticity::elasticity_of_substitution(self, allocation, i, j)
    }
}

/// Read an allocation value for a resource, defaulting to zero.
pub(crate) fn alloc_of(allocation: &BTreeMap<ResourceKind, f64>, k: ResourceKind) -> f64 {
    allocation.get(&k).copied().unwrap_or(0.0)
}
