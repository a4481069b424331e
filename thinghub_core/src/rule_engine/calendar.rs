//! CalendarItem activity and TimeEventItem firing, evaluated once per
//! tick against the engine's current `DateTime` (§4.6).
//!
//! Intervals (`[anchor + startTime, anchor + startTime + duration)`)
//! may cross midnight, month, or year boundaries, so activity is
//! checked against a window of candidate anchors wide enough to cover
//! the item's own duration, not just "yesterday/today/tomorrow".

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, NaiveTime, Timelike, Utc};

use crate::types::{CalendarItem, RepeatingMode, TimeEventItem};

fn day_matches(mode: RepeatingMode, week_days: &[u8], month_days: &[u8], date: NaiveDate) -> bool {
    match mode {
        RepeatingMode::None | RepeatingMode::Daily => true,
        RepeatingMode::Hourly => true,
        RepeatingMode::Weekly => week_days.contains(&(date.weekday().number_from_monday() as u8)),
        RepeatingMode::Monthly => month_days.contains(&(date.day() as u8)),
        RepeatingMode::Yearly => false,
    }
}

fn day_anchor_window(duration_minutes: i64) -> i64 {
    (duration_minutes as f64 / 1440.0).ceil() as i64 + 1
}

fn hour_anchor_window(duration_minutes: i64) -> i64 {
    (duration_minutes as f64 / 60.0).ceil() as i64 + 1
}

pub fn calendar_item_active(item: &CalendarItem, now: DateTime<Utc>) -> bool {
    let duration = ChronoDuration::minutes(item.duration);

    if let Some(start) = item.start_date_time {
        let mode = item.repeating.mode();
        if mode == RepeatingMode::Yearly {
            for delta_years in [-1i32, 0, 1] {
                let year = start.year() + delta_years;
                let Some(candidate_date) = NaiveDate::from_ymd_opt(year, start.month(), start.day())
                else {
                    // Feb 29 in a non-leap year: the item simply doesn't
                    // occur that year.
                    continue;
                };
                let candidate = candidate_date.and_time(start.time()).and_utc();
                if now >= candidate && now < candidate + duration {
                    return true;
                }
            }
            return false;
        }
        return now >= start.and_utc() && now < start.and_utc() + duration;
    }

    let Some(start_time) = item.start_time else {
        return false;
    };

    if item.repeating.mode() == RepeatingMode::Hourly {
        let window = hour_anchor_window(item.duration);
        for i in 0..=window {
            let candidate = (now - ChronoDuration::hours(i))
                .with_minute(start_time.minute())
                .and_then(|d| d.with_second(0))
                .and_then(|d| d.with_nanosecond(0));
            if let Some(candidate) = candidate {
                if now >= candidate && now < candidate + duration {
                    return true;
                }
            }
        }
        return false;
    }

    let window = day_anchor_window(item.duration);
    for i in 0..=window {
        let anchor_date = now.date_naive() - ChronoDuration::days(i);
        if !day_matches(
            item.repeating.mode(),
            &item.repeating.week_days,
            &item.repeating.month_days,
            anchor_date,
        ) {
            continue;
        }
        let candidate = anchor_date.and_time(start_time).and_utc();
        if now >= candidate && now < candidate + duration {
            return true;
        }
    }
    false
}

/// A rule with no calendar items at all isn't calendar-gated; absence
/// of a gate means the gate holds, not that it's permanently shut.
pub fn calendar_descriptor_active(items: &[CalendarItem], now: DateTime<Utc>) -> bool {
    items.is_empty() || items.iter().any(|item| calendar_item_active(item, now))
}

/// Fires exactly on the minute the item's target matches `now`
/// (minute-aligned; caller is expected to invoke this once per minute).
pub fn time_event_item_fires(item: &TimeEventItem, now: DateTime<Utc>) -> bool {
    if let Some(target) = item.date_time {
        if item.repeating.mode() == RepeatingMode::Yearly {
            return now.month() == target.month()
                && now.day() == target.day()
                && now.hour() == target.hour()
                && now.minute() == target.minute();
        }
        return now.date_naive() == target.date() && now.hour() == target.hour() && now.minute() == target.minute();
    }

    let Some(time) = item.time else {
        return false;
    };
    if now.hour() != time.hour() || now.minute() != time.minute() {
        return false;
    }
    day_matches(
        item.repeating.mode(),
        &item.repeating.week_days,
        &item.repeating.month_days,
        now.date_naive(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RepeatingOption;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn daily_item_crossing_midnight_is_active_after_midnight() {
        let item = CalendarItem {
            start_time: Some(NaiveTime::from_hms_opt(23, 0, 0).unwrap()),
            start_date_time: None,
            duration: 120,
            repeating: RepeatingOption {
                mode: Some(RepeatingMode::Daily),
                ..Default::default()
            },
        };
        assert!(calendar_item_active(&item, dt(2026, 3, 2, 0, 30)));
        assert!(!calendar_item_active(&item, dt(2026, 3, 2, 1, 30)));
    }

    #[test]
    fn weekly_saturday_item_with_long_duration_crosses_into_monday() {
        // Saturday 08:00 + 2880 minutes (2 days) runs through Sunday into Monday 08:00.
        let item = CalendarItem {
            start_time: Some(NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
            start_date_time: None,
            duration: 2880,
            repeating: RepeatingOption {
                mode: Some(RepeatingMode::Weekly),
                week_days: vec![6], // Saturday
                month_days: vec![],
            },
        };
        // 2026-02-28 is a Saturday.
        assert!(calendar_item_active(&item, dt(2026, 3, 1, 12, 0))); // Sunday
        assert!(calendar_item_active(&item, dt(2026, 3, 2, 7, 59))); // just before Monday 08:00
        assert!(!calendar_item_active(&item, dt(2026, 3, 2, 8, 0))); // Monday 08:00, interval closed
    }

    #[test]
    fn yearly_feb_29_only_activates_in_leap_years() {
        let item = CalendarItem {
            start_time: None,
            start_date_time: Some(
                NaiveDate::from_ymd_opt(2024, 2, 29)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ),
            duration: 60,
            repeating: RepeatingOption {
                mode: Some(RepeatingMode::Yearly),
                ..Default::default()
            },
        };
        assert!(calendar_item_active(&item, dt(2028, 2, 29, 0, 30))); // leap year
        assert!(!calendar_item_active(&item, dt(2026, 2, 28, 0, 30))); // non-leap: no Feb 29
    }

    #[test]
    fn descriptor_with_no_calendar_items_is_not_gated() {
        assert!(calendar_descriptor_active(&[], dt(2026, 3, 2, 7, 30)));
    }

    #[test]
    fn time_event_item_fires_exactly_once_on_target_minute() {
        let item = TimeEventItem {
            time: Some(NaiveTime::from_hms_opt(7, 30, 0).unwrap()),
            date_time: None,
            repeating: RepeatingOption {
                mode: Some(RepeatingMode::Daily),
                ..Default::default()
            },
        };
        assert!(time_event_item_fires(&item, dt(2026, 3, 2, 7, 30)));
        assert!(!time_event_item_fires(&item, dt(2026, 3, 2, 7, 31)));
    }

    #[test]
    fn yearly_date_time_event_fires_on_same_month_day_each_year() {
        let item = TimeEventItem {
            time: None,
            date_time: Some(
                NaiveDate::from_ymd_opt(2020, 12, 31)
                    .unwrap()
                    .and_hms_opt(23, 59, 0)
                    .unwrap(),
            ),
            repeating: RepeatingOption {
                mode: Some(RepeatingMode::Yearly),
                ..Default::default()
            },
        };
        assert!(time_event_item_fires(&item, dt(2031, 12, 31, 23, 59)));
        assert!(!time_event_item_fires(&item, dt(2031, 12, 30, 23, 59)));
    }
}
