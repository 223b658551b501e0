use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    /// Long signals trade calls, short signals trade puts. Fixed mapping.
    pub fn option_side(&self) -> OptionSide {
        match self {
            Direction::Long => OptionSide::Call,
            Direction::Short => OptionSide::Put,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionSide::Call => "CALL",
            OptionSide::Put => "PUT",
        }
    }

    /// NSE instrument-type code used by the Upstox contract listings.
    pub fn nse_code(&self) -> &'static str {
        match self {
            OptionSide::Call => "CE",
            OptionSide::Put => "PE",
        }
    }

    /// Sign applied to exit-minus-entry differences: +1 for calls (long
    /// signals), -1 for puts (short signals).
    pub fn direction_sign(&self) -> f64 {
        match self {
            OptionSide::Call => 1.0,
            OptionSide::Put => -1.0,
        }
    }
}

impl fmt::Display for OptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Moneyness {
    Atm,
    Itm1,
    Otm1,
}

impl Moneyness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Moneyness::Atm => "ATM",
            Moneyness::Itm1 => "ITM1",
            Moneyness::Otm1 => "OTM1",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Moneyness> {
        match s.to_ascii_uppercase().as_str() {
            "ATM" => Some(Moneyness::Atm),
            "ITM1" => Some(Moneyness::Itm1),
            "OTM1" => Some(Moneyness::Otm1),
            _ => None,
        }
    }
}

impl fmt::Display for Moneyness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One directional round-trip from the upstream signal source.
/// Timestamps are exchange-local (IST), matching the quote data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    pub trade_id: u32,
    pub side: Direction,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_spot: f64,
    pub exit_spot: f64,
}

impl TradeSignal {
    /// Upstream validation: entry must precede exit, spots must be positive.
    pub fn validate(&self) -> Result<(), String> {
        if self.entry_time >= self.exit_time {
            return Err(format!(
                "entry time {} is not before exit time {}",
                self.entry_time, self.exit_time
            ));
        }
        if self.entry_spot <= 0.0 || self.exit_spot <= 0.0 {
            return Err(format!(
                "non-positive spot price (entry {}, exit {})",
                self.entry_spot, self.exit_spot
            ));
        }
        Ok(())
    }
}

/// Option contract derived from a trade signal: side, expiry, strike, and the
/// matched entry/exit premiums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionLeg {
    pub trade_id: u32,
    pub option_side: OptionSide,
    pub expiry_date: NaiveDate,
    pub strike: f64,
    pub entry_option_price: f64,
    pub exit_option_price: f64,
}
