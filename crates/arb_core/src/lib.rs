//! arb_core — resource vocabulary, agent/pool data model, numeric constants,
//! and deterministic ordering helpers for the arbitration engine.
//!
//! This crate is **computation-free** beyond basic invariant checks: it
//! defines the stable types shared by `arb_algo`, `arb_pipeline`, `arb_io`,
//! and `arb_report`. No I/O, no randomness, no optimization.

pub mod constants;
pub mod determinism;
pub mod errors;
pub mod ids;
pub mod resource;
pub mod utility;
pub mod agent;
pub mod pool;

pub use constants::*;
pub use errors::CoreError;
pub use ids::AgentId;
pub use resource::ResourceKind;
pub use utility::{PreferenceWeights, UtilityForm};
pub use agent::Agent;
pub use pool::ResourcePool;
