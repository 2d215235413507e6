// Local business-day boundaries
//
// The shop reports by its own calendar day, not by UTC. These helpers turn
// local dates into UTC instants for store filters.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

/// Calendar of the shop, defined by a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct BusinessCalendar {
    offset: FixedOffset,
}

impl BusinessCalendar {
    /// Returns None when the offset is outside what `FixedOffset` accepts
    pub fn from_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours * 3600).map(|offset| Self { offset })
    }

    /// First instant of `date` in local time
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        match self.offset.from_local_datetime(&midnight).single() {
            Some(local) => local.with_timezone(&Utc),
            // A fixed offset never has gaps or folds
            None => Utc.from_utc_datetime(&midnight),
        }
    }

    /// Exclusive upper bound for a filter that includes the whole of `date`
    pub fn day_end_exclusive(&self, date: NaiveDate) -> DateTime<Utc> {
        self.day_start(date) + Duration::days(1)
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Start of the local day containing `now`
    pub fn today_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.day_start(self.local_date(now))
    }

    /// Start of the local month containing `now`
    pub fn month_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.local_date(now);
        let first = today.with_day(1).unwrap_or(today);
        self.day_start(first)
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self { offset: Utc.fix() }
    }
}
