use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// One traded-price observation from historical market data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: NaiveDateTime,
    pub price: f64,
}

/// Time-ordered collection of price samples for one instrument window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    samples: Vec<PriceSample>,
}

impl PriceSeries {
    /// Build a series, dropping non-positive prices (treated as missing data)
    /// and sorting oldest-first.
    pub fn new(mut samples: Vec<PriceSample>) -> Self {
        samples.retain(|s| s.price > 0.0);
        samples.sort_by_key(|s| s.timestamp);
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&PriceSample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&PriceSample> {
        self.samples.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceSample> {
        self.samples.iter()
    }

    pub fn as_slice(&self) -> &[PriceSample] {
        &self.samples
    }

    /// Keep only samples inside NSE market hours (09:15 to 15:30).
    pub fn filter_market_hours(&self) -> PriceSeries {
        let open = NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default();
        let close = NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default();
        let samples: Vec<PriceSample> = self
            .samples
            .iter()
            .filter(|s| {
                let t = s.timestamp.time();
                t >= open && t <= close
            })
            .copied()
            .collect();
        PriceSeries { samples }
    }
}

impl std::ops::Index<usize> for PriceSeries {
    type Output = PriceSample;
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl IntoIterator for PriceSeries {
    type Item = PriceSample;
    type IntoIter = std::vec::IntoIter<PriceSample>;
    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

impl<'a> IntoIterator for &'a PriceSeries {
    type Item = &'a PriceSample;
    type IntoIter = std::slice::Iter<'a, PriceSample>;
    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
