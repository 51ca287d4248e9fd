//! The arbitration solver (§4.5): single-resource water-filling and its
//! multi-resource fixed-point generalization.

pub mod multi;
pub mod single;

pub use multi::{arbitrate_multi_resource, MultiAllocation, MultiArbitrationOutcome};
pub use single::{water_fill_resource, water_fill_resource_checked, water_fill_resource_real, AllocationResult};
