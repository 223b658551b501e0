pub mod interval;
pub mod record;
pub mod sample;
pub mod trade;

pub use interval::DataInterval;
pub use record::{ResultRecord, TradeStatus};
pub use sample::{PriceSample, PriceSeries};
pub use trade::{Direction, Moneyness, OptionLeg, OptionSide, TradeSignal};
