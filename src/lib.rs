pub mod backtest;
pub mod config;
pub mod gateway;
pub mod models;
pub mod rules;
#[cfg(test)]
pub mod test_helpers;
