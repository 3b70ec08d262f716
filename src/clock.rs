//! Calendar-day arithmetic in the user's local timezone.
//!
//! Day keys are built from local date components, never from a UTC
//! conversion, so the reset boundary lines up with the wall clock.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;

use crate::data::DayKey;

pub fn day_key(date: NaiveDate) -> DayKey {
    date.format("%Y-%m-%d").to_string()
}

pub fn today_key() -> DayKey {
    day_key(Local::now().date_naive())
}

/// An absent marker counts as a new day so the first run stamps one.
pub fn is_new_day(last_marker: Option<&str>) -> bool {
    is_new_day_on(last_marker, &today_key())
}

pub fn is_new_day_on(last_marker: Option<&str>, today: &str) -> bool {
    match last_marker {
        Some(marker) if !marker.is_empty() => marker != today,
        _ => true,
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

pub fn time_until_next_midnight() -> Countdown {
    time_until_midnight_from(&Local::now())
}

/// Real time left until the next midnight in `now`'s timezone, so a day with
/// a DST shift counts down 23 or 25 hours.
pub fn time_until_midnight_from<Tz: TimeZone>(now: &DateTime<Tz>) -> Countdown {
    countdown_between(now, &next_midnight(now))
}

/// The first instant of the next local day. When a DST jump skips
/// midnight, the day starts at the first local time that exists.
pub fn next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let zone = now.timezone();
    let midnight = (now.date_naive() + Duration::days(1)).and_time(NaiveTime::MIN);

    (0..=3)
        .find_map(|hours| {
            let local = midnight + Duration::hours(hours);
            zone.from_local_datetime(&local).earliest()
        })
        .unwrap_or_else(|| now.clone() + Duration::days(1))
}

pub fn countdown_between<Tz: TimeZone>(from: &DateTime<Tz>, to: &DateTime<Tz>) -> Countdown {
    let remaining = to
        .clone()
        .signed_duration_since(from.clone())
        .num_seconds()
        .max(0);

    Countdown {
        hours: remaining / 3600,
        minutes: (remaining % 3600) / 60,
        seconds: remaining % 60,
    }
}

pub fn format_countdown(countdown: &Countdown) -> String {
    if countdown.hours > 0 {
        format!("{}h {}m until reset", countdown.hours, countdown.minutes)
    } else if countdown.minutes > 0 {
        format!("{}m {}s until reset", countdown.minutes, countdown.seconds)
    } else {
        format!("{}s until reset", countdown.seconds)
    }
}

/// Source of "today" for the reset coordinator.
pub trait Clock: Send + Sync {
    fn today_key(&self) -> DayKey;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today_key(&self) -> DayKey {
        today_key()
    }
}
