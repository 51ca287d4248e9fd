//! Priority economy (§4.4): burning currency raises an agent's arbitration
//! weight but always destroys the currency — nothing is ever transferred
//! between agents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use arb_core::agent::Agent;
use arb_core::{BASE_WEIGHT, MIN_BALANCE};

/// Clamp a desired burn to `[0, balance - MIN_BALANCE]` so burning can never
/// push an agent's balance below the floor (§4.4).
pub fn clamp_burn(balance: Decimal, desired: Decimal) -> Decimal {
    if desired.is_sign_negative() {
        return Decimal::ZERO;
    }
    let floor = Decimal::try_from(MIN_BALANCE).unwrap_or(Decimal::MIN);
    let headroom = balance - floor;
    if headroom.is_sign_negative() {
        Decimal::ZERO
    } else {
        desired.min(headroom)
    }
}

/// Destroy `burn` units of currency from `agent`'s balance, after clamping
/// it to the agent's available headroom above `MIN_BALANCE`. Returns the
/// burn actually applied.
pub fn apply_burn(agent: &mut Agent, desired: Decimal) -> Decimal {
    let actual = clamp_burn(agent.balance, desired);
    agent.balance -= actual;
    actual
}

/// `weight = BASE_WEIGHT + burn` (§4.4): every agent keeps a positive weight
/// even at zero burn, so a currency-exhausted agent still participates.
pub fn priority_weight(burn: Decimal) -> f64 {
    BASE_WEIGHT + burn.to_f64().unwrap_or(0.0)
}
