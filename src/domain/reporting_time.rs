//! Reporting-timezone calendar helpers.
//!
//! All "today" and "end of day" boundaries are computed in India Standard
//! Time (UTC+5:30, no daylight saving) so that they do not move with the
//! server's locale.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Timezone in which calendar days are reported.
pub const REPORTING_TZ: Tz = chrono_tz::Asia::Kolkata;

/// Number of trailing days covered by the historical valuation series.
pub const HISTORY_DAYS: u64 = 30;

/// Half-open interval `[start, end)` covering one reporting-timezone day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    /// Reporting-timezone calendar date of the window.
    pub date: NaiveDate,
    /// Local midnight at the start of `date`, as UTC.
    pub start: DateTime<Utc>,
    /// Local midnight at the start of the following day, as UTC.
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Window for the given reporting-timezone date. `None` only if the
    /// date sits at the edge of the representable calendar.
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Option<Self> {
        let next = date.checked_add_days(Days::new(1))?;
        let midnight = NaiveTime::from_hms_opt(0, 0, 0)?;
        Some(Self {
            date,
            start: local_instant(date, midnight)?,
            end: local_instant(next, midnight)?,
        })
    }

    /// Window for the reporting day that contains `now`.
    #[must_use]
    pub fn containing(now: DateTime<Utc>) -> Option<Self> {
        Self::for_date(reporting_date(now))
    }

    /// Returns `true` if `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Calendar date of `now` in the reporting timezone.
#[must_use]
pub fn reporting_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&REPORTING_TZ).date_naive()
}

/// 23:59:59 local on `date`, as UTC.
#[must_use]
pub fn end_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(23, 59, 59)?;
    local_instant(date, time)
}

/// The `count` reporting dates ending yesterday, most recent first.
#[must_use]
pub fn trailing_dates(now: DateTime<Utc>, count: u64) -> Vec<NaiveDate> {
    let today = reporting_date(now);
    (1..=count)
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .collect()
}

fn local_instant(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    REPORTING_TZ
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|local| local.with_timezone(&Utc))
}
