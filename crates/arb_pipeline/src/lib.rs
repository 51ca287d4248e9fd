//! Orchestration of a single arbitration round and the longitudinal history
//! across rounds: register agents, detect contention, settle weights, run
//! the solver, verify Pareto optimality, and record what happened.

use arb_core::AgentId;

pub mod budget;
pub mod observer;
pub mod round;
pub mod tracker;
pub mod verify;

pub use budget::{ExecutionBudget, FixedCostBackend, InsufficientBudget, ServiceBackend, ServiceCostTable, ServiceInvocationError, ServiceType};
pub use observer::RuntimeObserver;
pub use round::{BurnStrategy, RoundDriver};
pub use tracker::RoundSnapshot;
pub use verify::{
    gini_coefficient, is_pareto_improvement, is_strict_pareto_improvement, utility_vector, verify_pareto_optimal, welfare,
    InterRoundComparison, ParetoReport, ParetoViolation,
};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("core data model rejected the request: {0}")]
    Core(#[from] arb_core::errors::CoreError),
    #[error("agent {0} is not registered in this round")]
    UnknownAgent(AgentId),
    #[error("agent {0} is already registered in this round")]
    DuplicateAgent(AgentId),
    #[error("no allocation has been computed for this round yet")]
    NoAllocationYet,
    #[error("a checkpoint for this round has already been approved")]
    CheckpointAlreadyApproved,
}
