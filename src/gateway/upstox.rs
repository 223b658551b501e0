use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Asia::Kolkata;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::gateway::{GatewayError, MarketDataGateway, OptionQuery};
use crate::models::{OptionSide, PriceSample, PriceSeries};

const BASE_URL: &str = "https://api.upstox.com/v2";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Deserialize)]
struct Contract {
    instrument_key: String,
    trading_symbol: String,
    strike_price: f64,
    instrument_type: String,
}

#[derive(Debug, Deserialize)]
struct ContractResponse {
    #[serde(default)]
    data: Vec<Contract>,
}

#[derive(Debug, Deserialize)]
struct InstrumentRef {
    instrument_key: String,
}

#[derive(Debug, Deserialize)]
struct ChainRow {
    strike_price: f64,
    call_options: Option<InstrumentRef>,
    put_options: Option<InstrumentRef>,
}

#[derive(Debug, Deserialize)]
struct ChainResponse {
    #[serde(default)]
    data: Vec<ChainRow>,
}

#[derive(Debug, Deserialize, Default)]
struct CandleData {
    #[serde(default)]
    candles: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CandleResponse {
    #[serde(default)]
    data: CandleData,
}

/// Live market-data gateway against the Upstox v2 API.
///
/// Archived contracts (expiry before today) go through the
/// expired-instruments endpoints; everything else through the live option
/// chain. Contract listings and resolved instrument keys are cached per run,
/// and outbound requests are spaced at least 100ms apart.
pub struct UpstoxGateway {
    client: Client,
    access_token: String,
    last_request: Mutex<Option<Instant>>,
    expired_contracts: Mutex<HashMap<NaiveDate, Vec<Contract>>>,
    live_instruments: Mutex<HashMap<String, String>>,
}

impl UpstoxGateway {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            access_token: cfg.access_token.clone(),
            last_request: Mutex::new(None),
            expired_contracts: Mutex::new(HashMap::new()),
            live_instruments: Mutex::new(HashMap::new()),
        }
    }

    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<String, GatewayError> {
        self.rate_limit().await;

        let resp = self
            .client
            .get(format!("{}{}", BASE_URL, path))
            .query(params)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.text().await?)
    }

    /// Resolve the instrument key for an archived (already expired) contract.
    /// Falls back to the next-week expiry when the series is not archived
    /// yet, and to the closest listed strike when the exact one is missing.
    async fn expired_instrument_key(&self, query: &OptionQuery) -> Result<String, GatewayError> {
        let mut expiry = query.expiry_date;
        let mut contracts = self.expired_contracts_for(&query.underlying, expiry).await?;

        if contracts.is_empty() {
            let next_week = expiry + ChronoDuration::days(7);
            warn!(
                "No archived contracts for {} - trying next-week expiry {}",
                expiry, next_week
            );
            contracts = self.expired_contracts_for(&query.underlying, next_week).await?;
            if contracts.is_empty() {
                return Err(GatewayError::NoInstrument {
                    side: query.option_side,
                    strike: query.strike,
                    expiry: query.expiry_date,
                });
            }
            expiry = next_week;
        }

        find_contract(&contracts, query.strike, query.option_side).ok_or(
            GatewayError::NoInstrument {
                side: query.option_side,
                strike: query.strike,
                expiry,
            },
        )
    }

    async fn expired_contracts_for(
        &self,
        underlying: &str,
        expiry: NaiveDate,
    ) -> Result<Vec<Contract>, GatewayError> {
        if let Some(cached) = self.expired_contracts.lock().await.get(&expiry) {
            debug!("Using cached expired contracts for {}", expiry);
            return Ok(cached.clone());
        }

        debug!("Fetching expired contracts for {}", expiry);
        let body = self
            .get(
                "/expired-instruments/option/contract",
                &[
                    ("instrument_key", underlying.to_string()),
                    ("expiry_date", expiry.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;

        let parsed: ContractResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::BadPayload(e.to_string()))?;

        self.expired_contracts
            .lock()
            .await
            .insert(expiry, parsed.data.clone());
        Ok(parsed.data)
    }

    /// Resolve the instrument key for a live contract via the option chain.
    async fn live_instrument_key(&self, query: &OptionQuery) -> Result<String, GatewayError> {
        let cache_key = format!(
            "{}_{}_{}",
            query.expiry_date, query.strike, query.option_side
        );
        if let Some(cached) = self.live_instruments.lock().await.get(&cache_key) {
            debug!("Using cached live instrument for {}", cache_key);
            return Ok(cached.clone());
        }

        debug!("Fetching live option chain for {}", query.expiry_date);
        let body = self
            .get(
                "/option/chain",
                &[
                    ("instrument_key", query.underlying.clone()),
                    ("expiry_date", query.expiry_date.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;

        let parsed: ChainResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::BadPayload(e.to_string()))?;

        for row in parsed.data {
            if (row.strike_price - query.strike).abs() >= 0.01 {
                continue;
            }
            let inst = match query.option_side {
                OptionSide::Call => row.call_options,
                OptionSide::Put => row.put_options,
            };
            if let Some(inst) = inst {
                self.live_instruments
                    .lock()
                    .await
                    .insert(cache_key, inst.instrument_key.clone());
                return Ok(inst.instrument_key);
            }
        }

        Err(GatewayError::NoInstrument {
            side: query.option_side,
            strike: query.strike,
            expiry: query.expiry_date,
        })
    }

    async fn fetch_candles(
        &self,
        instrument_key: &str,
        query: &OptionQuery,
        expired: bool,
    ) -> Result<PriceSeries, GatewayError> {
        let from_date = query.from_ts.date().format("%Y-%m-%d");
        let to_date = query.to_ts.date().format("%Y-%m-%d");
        let prefix = if expired { "/expired-instruments" } else { "" };
        let path = format!(
            "{}/historical-candle/{}/{}/{}/{}",
            prefix,
            instrument_key,
            query.interval.as_str(),
            to_date,
            from_date
        );

        let body = self.get(&path, &[]).await?;
        let parsed: CandleResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::BadPayload(e.to_string()))?;

        let samples = parse_candles(&parsed.data.candles)?;
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

#[async_trait]
impl MarketDataGateway for UpstoxGateway {
    async fn fetch_prices(&self, query: &OptionQuery) -> Result<PriceSeries, GatewayError> {
        // A contract counts as expired once its expiry date is behind the
        // current exchange-local date.
        let today = Utc::now().with_timezone(&Kolkata).date_naive();
        let expired = query.expiry_date < today;

        let instrument_key = if expired {
            self.expired_instrument_key(query).await?
        } else {
            self.live_instrument_key(query).await?
        };

        // One retry with a short backoff; repeated failure is reported to the
        // engine as a per-trade error.
        match self.fetch_candles(&instrument_key, query, expired).await {
            Ok(series) => Ok(series),
            Err(e) => {
                warn!(
                    "Candle fetch failed for {} ({}), retrying: {}",
                    instrument_key, query.expiry_date, e
                );
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.fetch_candles(&instrument_key, query, expired).await
            }
        }
    }
}

/// Pick the contract matching `strike` exactly, or the closest listed strike
/// of the same side when the exact one is not in the archive.
fn find_contract(contracts: &[Contract], strike: f64, side: OptionSide) -> Option<String> {
    let code = side.nse_code();

    if let Some(exact) = contracts
        .iter()
        .find(|c| c.instrument_type == code && (c.strike_price - strike).abs() < 0.01)
    {
        debug!("Found contract {}", exact.trading_symbol);
        return Some(exact.instrument_key.clone());
    }

    let closest = contracts
        .iter()
        .filter(|c| c.instrument_type == code)
        .min_by(|a, b| {
            let da = (a.strike_price - strike).abs();
            let db = (b.strike_price - strike).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })?;
    warn!(
        "Exact strike {} not listed, using closest {} ({})",
        strike, closest.strike_price, closest.trading_symbol
    );
    Some(closest.instrument_key.clone())
}

/// Candle rows arrive as JSON arrays: [timestamp, open, high, low, close,
/// volume, oi]. The close is the traded-price sample.
fn parse_candles(rows: &[serde_json::Value]) -> Result<Vec<PriceSample>, GatewayError> {
    let mut samples = Vec::with_capacity(rows.len());

    for row in rows {
        let ts_str = row
            .get(0)
            .and_then(|v| v.as_str())
            .ok_or_else(|| GatewayError::BadPayload("missing candle timestamp".into()))?;
        let close = row
            .get(4)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| GatewayError::BadPayload("missing candle close".into()))?;

        let timestamp = parse_candle_timestamp(ts_str)
            .ok_or_else(|| GatewayError::BadPayload(format!("bad timestamp {ts_str:?}")))?;

        samples.push(PriceSample {
            timestamp,
            price: close,
        });
    }

    Ok(samples)
}

/// Upstox timestamps carry the +05:30 offset; the core works in naive
/// exchange-local time, so strip the offset after parsing.
fn parse_candle_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok()
}
