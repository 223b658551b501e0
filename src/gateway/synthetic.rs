use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::gateway::{GatewayError, MarketDataGateway, OptionQuery};
use crate::models::{PriceSample, PriceSeries};

/// Deterministic quote generator for dry runs and tests.
///
/// Selected explicitly by the caller instead of the live gateway; the live
/// gateway never substitutes synthetic data on failure. Prices are a smooth
/// function of the contract identity and the sample time, so repeated runs
/// over the same trades produce identical results.
pub struct SyntheticGateway {
    base_premium: f64,
}

impl SyntheticGateway {
    pub fn new() -> Self {
        Self { base_premium: 150.0 }
    }

    fn contract_seed(query: &OptionQuery) -> u64 {
        let mut hasher = DefaultHasher::new();
        query.expiry_date.hash(&mut hasher);
        query.option_side.hash(&mut hasher);
        (query.strike as i64).hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for SyntheticGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataGateway for SyntheticGateway {
    async fn fetch_prices(&self, query: &OptionQuery) -> Result<PriceSeries, GatewayError> {
        let seed = Self::contract_seed(query);
        let base = self.base_premium + (seed % 200) as f64;
        let phase = (seed % 628) as f64 / 100.0;

        let step = ChronoDuration::minutes(query.interval.as_minutes());
        let mut samples = Vec::new();
        let mut ts = query.from_ts;
        while ts <= query.to_ts {
            let minutes = (ts - query.from_ts).num_minutes() as f64;
            // Smooth oscillation around the base premium, floored well above
            // zero so every sample passes the positive-price invariant.
            let price = base + 30.0 * (minutes * 0.02 + phase).sin();
            samples.push(PriceSample {
                timestamp: ts,
                price: price.max(1.0),
            });
            ts += step;
        }

        let series = PriceSeries::new(samples).filter_market_hours();
        if series.is_empty() {
            return Err(GatewayError::NoCandles {
                from: query.from_ts,
                to: query.to_ts,
            });
        }
        Ok(series)
    }
}
