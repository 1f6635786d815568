//! Per-weekday working-time configuration.
//!
//! The calendar check treats a task interval as valid only when every
//! day-portion of it lies inside that weekday's working window. All
//! intervals are half-open [start, end).

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub is_working_day: bool,
}

/// The 7-entry per-weekday table, indexed Monday..Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekCalendar {
    days: [WorkingHours; 7],
}

impl WeekCalendar {
    /// Validates that every working day has start < end.
    pub fn new(days: [WorkingHours; 7]) -> Result<Self, CoreError> {
        for (i, day) in days.iter().enumerate() {
            let expected = Weekday::try_from(i as u8)
                .map_err(|_| CoreError::InvalidWorkingHours(format!("bad weekday index {i}")))?;
            if day.weekday != expected {
                return Err(CoreError::InvalidWorkingHours(format!(
                    "entry {i} must be {expected}, got {}",
                    day.weekday
                )));
            }
            if day.is_working_day && day.start >= day.end {
                return Err(CoreError::InvalidWorkingHours(format!(
                    "{}: start {} is not before end {}",
                    day.weekday, day.start, day.end
                )));
            }
        }
        Ok(Self { days })
    }

    /// Monday-Friday 08:00-17:00, weekend off.
    pub fn standard() -> Self {
        let day = |weekday, working| WorkingHours {
            weekday,
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            is_working_day: working,
        };
        Self {
            days: [
                day(Weekday::Mon, true),
                day(Weekday::Tue, true),
                day(Weekday::Wed, true),
                day(Weekday::Thu, true),
                day(Weekday::Fri, true),
                day(Weekday::Sat, false),
                day(Weekday::Sun, false),
            ],
        }
    }

    pub fn day(&self, weekday: Weekday) -> &WorkingHours {
        &self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn days(&self) -> &[WorkingHours; 7] {
        &self.days
    }

    /// Whether [start, end) lies fully inside working windows.
    ///
    /// Walks the interval day by day; each day-portion must fall on a
    /// working day within [day.start, day.end]. A portion running up to
    /// midnight never fits, since no window extends to 24:00.
    pub fn contains_interval(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        if end <= start {
            return true;
        }
        let mut cursor = start;
        while cursor < end {
            let hours = self.day(cursor.date().weekday());
            if !hours.is_working_day {
                return false;
            }
            if cursor.time() < hours.start {
                return false;
            }
            let next_midnight = match cursor.date().succ_opt() {
                Some(d) => d.and_time(NaiveTime::MIN),
                None => return false,
            };
            if end <= next_midnight {
                return end.time() != NaiveTime::MIN && end.time() <= hours.end;
            }
            // Portion continues past midnight, so it cannot stay inside
            // this day's window.
            return false;
        }
        true
    }

    /// The next instant at or after `from` that falls inside a working
    /// window. `None` if the whole week is non-working.
    pub fn next_working_start(&self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        let mut date = from.date();
        for offset in 0..8 {
            let hours = self.day(date.weekday());
            if hours.is_working_day {
                if offset == 0 {
                    if from.time() < hours.start {
                        return Some(date.and_time(hours.start));
                    }
                    if from.time() < hours.end {
                        return Some(from);
                    }
                } else {
                    return Some(date.and_time(hours.start));
                }
            }
            date = date.succ_opt()?;
        }
        None
    }

    /// End of the due day, as the first instant past it.
    pub fn end_of_day(date: chrono::NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + Duration::days(1)
    }
}
