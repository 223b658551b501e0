pub mod engine;
pub mod matcher;
pub mod metrics;
pub mod report;

pub use engine::{BacktestEngine, BacktestRun};
pub use metrics::BacktestSummary;
