use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Candle interval supported by the Upstox historical endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataInterval {
    #[serde(rename = "1minute")]
    M1,
    #[serde(rename = "5minute")]
    M5,
}

impl DataInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataInterval::M1 => "1minute",
            DataInterval::M5 => "5minute",
        }
    }

    pub fn as_duration(&self) -> Duration {
        match self {
            DataInterval::M1 => Duration::from_secs(60),
            DataInterval::M5 => Duration::from_secs(300),
        }
    }

    pub fn from_str_loose(s: &str) -> Option<DataInterval> {
        match s {
            "1minute" | "1m" => Some(DataInterval::M1),
            "5minute" | "5m" => Some(DataInterval::M5),
            _ => None,
        }
    }

    pub fn as_minutes(&self) -> i64 {
        self.as_duration().as_secs() as i64 / 60
    }
}

impl fmt::Display for DataInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
