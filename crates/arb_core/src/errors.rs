//! Validation error taxonomy shared by construction-time checks across the
//! data model (§7 `ValidationError`: rejected at construction, propagated to
//! the caller; never a panic).

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum CoreError {
    /// A preference or utility weight was negative.
    #[error("negative weight for resource {resource}")]
    NegativeWeight { resource: &'static str },
    /// All weights supplied to a preference/utility construction summed to zero.
    #[error("weights sum to zero")]
    DegenerateWeights,
    /// `min_request[k] > ideal_request[k]` for some resource.
    #[error("min request exceeds ideal request for resource {resource}")]
    MinExceedsIdeal { resource: String },
    /// A utility form's own parameters are malformed (e.g. CES rho not finite,
    /// loss-aversion lambda < 1, negative reference point, zero nest count).
    #[error("malformed utility parameters: {0}")]
    MalformedUtilityParams(String),
    /// An agent's starting balance is below `MIN_BALANCE`.
    #[error("balance {balance} is below the minimum balance floor {floor}")]
    BalanceBelowFloor { balance: f64, floor: f64 },
    /// A token/id string did not satisfy the allowed charset/length.
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// Resource pool capacity/available invariant violated (`available > capacity`
    /// or negative available) at construction.
    #[error("invalid pool state for resource {resource}: available exceeds capacity or is negative")]
    InvalidPoolState { resource: String },
}
