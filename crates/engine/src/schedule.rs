//! Daily session times.
//!
//! Entries are spaced `24 / frequency` hours apart, starting from the hour and minute the
//! process started at. Restarting the process therefore shifts the whole schedule.

use std::fmt;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};

use crate::errors::ScheduleError;

/// Hours in a day.
pub const HOURS_PER_DAY: u32 = 24;

/// A time of day at which a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduleEntry(NaiveTime);

impl ScheduleEntry {
    /// The hour, `0..24`.
    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    /// The minute, `0..60`.
    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Cron-style representation, `"M H * * *"`.
    pub fn cron_expression(&self) -> String {
        format!("{} {} * * *", self.minute(), self.hour())
    }

    /// The first occurrence strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.0);
        if today > now {
            today
        } else {
            today + TimeDelta::days(1)
        }
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// The full set of daily entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    frequency: u32,
    interval_hours: u32,
    entries: Vec<ScheduleEntry>,
}

impl Schedule {
    /// Sessions per day.
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Hours between two entries.
    pub fn interval_hours(&self) -> u32 {
        self.interval_hours
    }

    /// The entries, in generation order starting with the start time.
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Whether 24 is not a multiple of the frequency, in which case the last gap of the day is
    /// longer than the others.
    pub fn is_uneven(&self) -> bool {
        HOURS_PER_DAY % self.frequency != 0
    }

    /// The soonest entry after `now` and when it fires.
    pub fn next_trigger(&self, now: NaiveDateTime) -> Option<(ScheduleEntry, NaiveDateTime)> {
        self.entries
            .iter()
            .map(|entry| (*entry, entry.next_after(now)))
            .min_by_key(|(_, at)| *at)
    }

    /// Time left until the soonest entry.
    pub fn countdown(&self, now: NaiveDateTime) -> Option<(ScheduleEntry, TimeDelta)> {
        self.next_trigger(now).map(|(entry, at)| (entry, at - now))
    }
}

/// Computes `frequency` daily entries anchored at `start`'s hour and minute.
pub fn compute_schedule(frequency: u32, start: NaiveTime) -> Result<Schedule, ScheduleError> {
    if !(1..=HOURS_PER_DAY).contains(&frequency) {
        return Err(ScheduleError::InvalidFrequency(frequency));
    }

    let interval_hours = HOURS_PER_DAY / frequency;
    // seconds are dropped, entries are whole minutes
    let anchor = start
        - TimeDelta::seconds(i64::from(start.second()))
        - TimeDelta::nanoseconds(i64::from(start.nanosecond()));

    let entries = (0..frequency)
        .map(|i| ScheduleEntry(anchor + TimeDelta::hours(i64::from(i * interval_hours))))
        .collect();

    Ok(Schedule {
        frequency,
        interval_hours,
        entries,
    })
}
