use chrono::NaiveDateTime;

use crate::models::{PriceSample, PriceSeries};

/// The sample whose timestamp is closest to `target`, or `None` when the
/// series is empty. Equidistant candidates resolve to the earlier timestamp,
/// so matching is deterministic and reproducible.
pub fn closest_price(samples: &PriceSeries, target: NaiveDateTime) -> Option<PriceSample> {
    let mut best: Option<(i64, PriceSample)> = None;

    for sample in samples.iter() {
        let dist = (sample.timestamp - target).num_seconds().abs();
        match best {
            // Strict comparison keeps the earlier of two equidistant samples,
            // since the series is ordered oldest-first.
            Some((best_dist, _)) if dist >= best_dist => {}
            _ => best = Some((dist, *sample)),
        }
    }

    best.map(|(_, sample)| sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{samples_from, ts};

    #[test]
    fn empty_series_yields_none() {
        let series = PriceSeries::default();
        assert!(closest_price(&series, ts("2025-11-03 09:30")).is_none());
    }

    #[test]
    fn picks_unique_nearest_sample() {
        let series = samples_from(&[
            ("2025-11-03 09:15", 200.0),
            ("2025-11-03 09:30", 210.0),
            ("2025-11-03 09:45", 220.0),
        ]);
        let hit = closest_price(&series, ts("2025-11-03 09:33")).unwrap();
        assert_eq!(hit.price, 210.0);
    }

    #[test]
    fn tie_breaks_to_earlier_sample() {
        let series = samples_from(&[
            ("2025-11-03 09:30:00", 210.0),
            ("2025-11-03 09:30:10", 211.0),
        ]);
        // 09:30:05 is five seconds from both candidates.
        let hit = closest_price(&series, ts("2025-11-03 09:30:05")).unwrap();
        assert_eq!(hit.timestamp, ts("2025-11-03 09:30:00"));
        assert_eq!(hit.price, 210.0);
    }

    #[test]
    fn target_outside_window_matches_boundary() {
        let series = samples_from(&[
            ("2025-11-03 09:15", 200.0),
            ("2025-11-03 15:30", 230.0),
        ]);
        let before = closest_price(&series, ts("2025-11-03 08:00")).unwrap();
        assert_eq!(before.price, 200.0);
        let after = closest_price(&series, ts("2025-11-03 18:00")).unwrap();
        assert_eq!(after.price, 230.0);
    }
}
