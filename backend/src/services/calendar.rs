use chrono::{Datelike, Days, NaiveDate, NaiveTime, Timelike};

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Monday of the ISO week containing `date`.
///
/// Every week boundary in the service comes from here: reflection keys,
/// weekly grouping and the meal view.
///
/// Saturates at the ends of the representable range instead of panicking.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = Days::new(u64::from(date.weekday().num_days_from_monday()));
    date.checked_sub_days(back).unwrap_or(NaiveDate::MIN)
}

/// Sunday closing the week that starts on `week_start`.
pub fn week_end(week_start: NaiveDate) -> NaiveDate {
    week_start
        .checked_add_days(Days::new(6))
        .unwrap_or(NaiveDate::MAX)
}

/// Hours slept between `bed` and `wake`, rounded to one decimal.
///
/// A wake time at or before the bed time falls on the next day, so
/// 23:00 -> 07:00 is 8.0 and 07:00 -> 07:00 is a full 24.0.
pub fn sleep_hours_between(bed: NaiveTime, wake: NaiveTime) -> f64 {
    let bed_secs = bed.num_seconds_from_midnight() as i64;
    let mut wake_secs = wake.num_seconds_from_midnight() as i64;
    if wake_secs <= bed_secs {
        wake_secs += SECS_PER_DAY;
    }
    round_to((wake_secs - bed_secs) as f64 / 3600.0, 1)
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
