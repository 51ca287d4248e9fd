// crates/arb_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Algorithm layer: utility evaluation, contention detection, the priority
//! economy, and the water-filling arbitration solver. Depends only on
//! `arb_core`.

mod mathutil;

pub mod arbitrate;
pub mod contention;
pub mod economy;
pub mod integerize;
pub mod utility;

pub use arbitrate::{
    arbitrate_multi_resource, water_fill_resource, water_fill_resource_checked, AllocationResult, MultiAllocation,
    MultiArbitrationOutcome,
};
pub use contention::{contested_resources, detect_contention, ContentionGroup};
pub use economy::{apply_burn, clamp_burn, priority_weight};
pub use utility::{elasticity_of_substitution, marginal_rate_of_substitution, MarginalUtility, UtilityEval};
