use crate::models::{Moneyness, OptionSide};

/// NIFTY strikes are listed every 50 points.
pub const STRIKE_INTERVAL: f64 = 50.0;

/// Strike price for the given spot, option side, and moneyness mode. Always a
/// multiple of [`STRIKE_INTERVAL`].
///
/// ATM rounds calls up and puts down, so the call strike is never below spot
/// and the put strike never above it. ITM1 steps two intervals further into
/// the money (the listed strike one step past ATM on the profitable side);
/// OTM1 steps one interval out.
pub fn calculate_strike(spot: f64, side: OptionSide, moneyness: Moneyness) -> f64 {
    let atm = atm_strike(spot, side);
    match (moneyness, side) {
        (Moneyness::Atm, _) => atm,
        (Moneyness::Itm1, OptionSide::Call) => atm + 2.0 * STRIKE_INTERVAL,
        (Moneyness::Itm1, OptionSide::Put) => atm - 2.0 * STRIKE_INTERVAL,
        (Moneyness::Otm1, OptionSide::Call) => atm - STRIKE_INTERVAL,
        (Moneyness::Otm1, OptionSide::Put) => atm + STRIKE_INTERVAL,
    }
}

fn atm_strike(spot: f64, side: OptionSide) -> f64 {
    match side {
        OptionSide::Call => (spot / STRIKE_INTERVAL).ceil() * STRIKE_INTERVAL,
        OptionSide::Put => (spot / STRIKE_INTERVAL).floor() * STRIKE_INTERVAL,
    }
}
