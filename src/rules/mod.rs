pub mod expiry;
pub mod strike;

pub use expiry::calculate_expiry;
pub use strike::{calculate_strike, STRIKE_INTERVAL};
