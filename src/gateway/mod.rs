pub mod synthetic;
pub mod upstox;

pub use synthetic::SyntheticGateway;
pub use upstox::UpstoxGateway;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::models::{DataInterval, OptionSide, PriceSeries};

/// One option-price request: a contract (underlying, expiry, strike, side)
/// and the time window to sample.
#[derive(Debug, Clone)]
pub struct OptionQuery {
    pub underlying: String,
    pub expiry_date: NaiveDate,
    pub strike: f64,
    pub option_side: OptionSide,
    pub from_ts: NaiveDateTime,
    pub to_ts: NaiveDateTime,
    pub interval: DataInterval,
}

/// The gateway cannot produce a price series. Recoverable per trade, never
/// fatal to the batch.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("no instrument for {side} {strike} expiring {expiry}")]
    NoInstrument {
        side: OptionSide,
        strike: f64,
        expiry: NaiveDate,
    },
    #[error("no candles returned for window {from} to {to}")]
    NoCandles {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },
    #[error("malformed candle payload: {0}")]
    BadPayload(String),
}

/// Historical option quote source. Implementations own lookup, caching,
/// rate limiting, and fallback; the engine only sees this contract and
/// treats any error as a recoverable per-leg failure.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    async fn fetch_prices(&self, query: &OptionQuery) -> Result<PriceSeries, GatewayError>;
}
