use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

/// Expiry date for a trade entered at `entry_time`, given the weekly expiry
/// weekday and the rollover cutoff weekday.
///
/// The current ISO week's occurrence of `expiry_weekday` is the base. Entries
/// on or after the rollover weekday target next week's expiry instead. If the
/// result would still fall before the entry date (entry late in the week with
/// an early expiry weekday), it is pushed one more week forward: an expiry
/// strictly in the past is never returned.
///
/// An entry on the expiry weekday itself, at or past the rollover cutoff,
/// deliberately rolls to next week even though "today" is an expiry day.
pub fn calculate_expiry(
    entry_time: NaiveDateTime,
    expiry_weekday: Weekday,
    rollover_weekday: Weekday,
) -> NaiveDate {
    let entry_date = entry_time.date();
    let entry_ord = entry_date.weekday().num_days_from_monday() as i64;
    let expiry_ord = expiry_weekday.num_days_from_monday() as i64;
    let rollover_ord = rollover_weekday.num_days_from_monday() as i64;

    // This ISO week's occurrence of the expiry weekday.
    let week_monday = entry_date - Duration::days(entry_ord);
    let mut expiry = week_monday + Duration::days(expiry_ord);

    if entry_ord >= rollover_ord {
        expiry += Duration::days(7);
    }

    // Never expire before the trade is entered.
    if expiry < entry_date {
        expiry += Duration::days(7);
    }

    expiry
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(date: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn monday_before_rollover_uses_current_week() {
        // 2025-11-03 is a Monday; rollover Tuesday, expiry Thursday.
        let expiry = calculate_expiry(at("2025-11-03"), Weekday::Thu, Weekday::Tue);
        assert_eq!(expiry, date("2025-11-06"));
    }

    #[test]
    fn entry_on_rollover_day_moves_to_next_week() {
        // Tuesday entry with Tuesday rollover: already at the cutoff.
        let expiry = calculate_expiry(at("2025-11-04"), Weekday::Thu, Weekday::Tue);
        assert_eq!(expiry, date("2025-11-13"));
    }

    #[test]
    fn entry_on_expiry_day_past_cutoff_rolls_over() {
        // Thursday entry, rollover Tuesday: next week's Thursday, not today.
        let expiry = calculate_expiry(at("2025-11-06"), Weekday::Thu, Weekday::Tue);
        assert_eq!(expiry, date("2025-11-13"));
    }

    #[test]
    fn entry_on_expiry_day_before_cutoff_expires_same_day() {
        // Thursday entry with Friday rollover: current week's Thursday is today.
        let expiry = calculate_expiry(at("2025-11-06"), Weekday::Thu, Weekday::Fri);
        assert_eq!(expiry, date("2025-11-06"));
    }

    #[test]
    fn weekend_entry_always_rolls_forward() {
        // Saturday and Sunday ordinals exceed every weekday rollover cutoff.
        let sat = calculate_expiry(at("2025-11-08"), Weekday::Thu, Weekday::Fri);
        assert_eq!(sat, date("2025-11-13"));
        let sun = calculate_expiry(at("2025-11-09"), Weekday::Thu, Weekday::Mon);
        assert_eq!(sun, date("2025-11-13"));
    }

    #[test]
    fn week_placement_holds_for_all_weekday_rollover_pairs() {
        // Week of 2025-11-03 (Mon) .. 2025-11-09 (Sun), expiry Thursday.
        let rollovers = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ];
        for entry_ord in 0..7i64 {
            let entry = at("2025-11-03") + Duration::days(entry_ord);
            for &rollover in &rollovers {
                let expiry = calculate_expiry(entry, Weekday::Thu, rollover);
                let this_week_thu = date("2025-11-06");
                if entry_ord < rollover.num_days_from_monday() as i64 {
                    assert_eq!(expiry, this_week_thu, "entry ord {entry_ord} rollover {rollover}");
                } else {
                    assert_eq!(
                        expiry,
                        this_week_thu + Duration::days(7),
                        "entry ord {entry_ord} rollover {rollover}"
                    );
                }
            }
        }
    }

    #[test]
    fn expiry_never_precedes_entry_date() {
        let expiries = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ];
        for entry_ord in 0..7i64 {
            let entry = at("2025-11-03") + Duration::days(entry_ord);
            for &expiry_day in &expiries {
                for &rollover in &expiries {
                    let expiry = calculate_expiry(entry, expiry_day, rollover);
                    assert!(
                        expiry >= entry.date(),
                        "expiry {expiry} before entry {entry} ({expiry_day}/{rollover})"
                    );
                }
            }
        }
    }
}
