//! Numerical constants (§6).

/// Base priority weight every agent gets regardless of burn, so a zero-currency
/// agent still participates with positive weight.
pub const BASE_WEIGHT: f64 = 10.0;

/// Floor on an agent's currency balance; burning cannot push balance below this.
pub const MIN_BALANCE: f64 = -100.0;

/// Clamp used inside utility interiors (Sqrt/Cobb-Douglas/etc.) to avoid
/// singular gradients at zero allocation.
pub const EPSILON: f64 = 1e-8;

/// Tolerance used by the Pareto verifier's pairwise unit-transfer probe.
pub const PARETO_EPSILON: f64 = 1e-9;

/// Sigmoid argument saturation bound for the Threshold utility variant.
pub const SIGMOID_SATURATION: f64 = 20.0;

/// Default elasticity-of-substitution window used when dispatching CES to its
/// Cobb-Douglas (rho -> 0) and Leontief (rho <= -100) limits.
pub const CES_RHO_WINDOW: (f64, f64) = (-5.0, 0.9);
pub const CES_LEONTIEF_THRESHOLD: f64 = -100.0;
pub const CES_COBB_DOUGLAS_THRESHOLD: f64 = 1e-6;

/// Multi-resource fixed point iteration bounds (§4.5).
pub const MAX_INNER_ITERATIONS: u32 = 25;
pub const FIXED_POINT_DAMPING: f64 = 0.5;
pub const FIXED_POINT_CONVERGENCE: f64 = 1e-4;

/// Preference-weight normalization tolerance (§3).
pub const WEIGHT_NORMALIZATION_TOLERANCE: f64 = 1e-3;

/// Baseline API_CREDITS allotment handed to a non-contending agent that
/// never specified an ideal request for that resource (§4.6 step 4).
pub const API_CREDITS_BASELINE: u64 = 10;
