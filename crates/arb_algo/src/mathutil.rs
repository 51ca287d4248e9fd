//! Small numeric helpers shared by the utility family and the solver.

use arb_core::EPSILON;

/// Clamp an allocation value away from exactly zero, avoiding singular
/// gradients in Sqrt/Cobb-Douglas/CES interiors.
pub fn floor_positive(x: f64) -> f64 {
    if x < EPSILON {
        EPSILON
    } else {
        x
    }
}

/// Numerically stable logistic sigmoid.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Numerically stable softplus, `ln(1 + e^x)`.
pub fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (1.0 + (-x).exp()).ln()
    } else {
        (1.0 + x.exp()).ln()
    }
}
