use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Day of the week, numbered 0 = Monday .. 6 = Sunday.
///
/// The numbering matches the stored schedule rows and
/// `NaiveDate::weekday().num_days_from_monday()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Numeric index, 0 = Monday .. 6 = Sunday.
    pub fn index(self) -> u8 {
        match self {
            Weekday::Monday => 0,
            Weekday::Tuesday => 1,
            Weekday::Wednesday => 2,
            Weekday::Thursday => 3,
            Weekday::Friday => 4,
            Weekday::Saturday => 5,
            Weekday::Sunday => 6,
        }
    }

    /// Weekday from a numeric index; `None` outside 0..=6.
    pub fn from_index(index: u8) -> Option<Weekday> {
        Weekday::ALL.get(index as usize).copied()
    }

    /// Weekday of a calendar date.
    pub fn from_date(date: NaiveDate) -> Weekday {
        // num_days_from_monday is always 0..=6
        Weekday::ALL[date.weekday().num_days_from_monday() as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monday" | "0" => Ok(Weekday::Monday),
            "tuesday" | "1" => Ok(Weekday::Tuesday),
            "wednesday" | "2" => Ok(Weekday::Wednesday),
            "thursday" | "3" => Ok(Weekday::Thursday),
            "friday" | "4" => Ok(Weekday::Friday),
            "saturday" | "5" => Ok(Weekday::Saturday),
            "sunday" | "6" => Ok(Weekday::Sunday),
            other => Err(format!("invalid weekday: '{other}'")),
        }
    }
}

/// A contiguous wall-clock working-hours range within a single day.
///
/// Times are provider-local and carry no timezone. Invariant: `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Build a range, rejecting empty or inverted ranges.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, String> {
        if start >= end {
            return Err(format!("start {start} must be before end {end}"));
        }
        Ok(Self { start, end })
    }

    /// Parse a pair of "HH:MM" strings as stored in the schedule table.
    pub fn parse(start: &str, end: &str) -> Result<Self, String> {
        let start = NaiveTime::parse_from_str(start, "%H:%M")
            .map_err(|e| format!("invalid start time '{start}': {e}"))?;
        let end = NaiveTime::parse_from_str(end, "%H:%M")
            .map_err(|e| format!("invalid end time '{end}': {e}"))?;
        Self::new(start, end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// A full week of optional working-hours ranges, indexed by weekday.
///
/// `None` means a day off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTemplate {
    pub days: [Option<TimeRange>; 7],
}

impl WeeklyTemplate {
    /// Range for a given weekday.
    pub fn day(&self, weekday: Weekday) -> Option<TimeRange> {
        self.days[weekday.index() as usize]
    }
}

impl Default for WeeklyTemplate {
    /// Monday through Friday 09:00-17:00, weekend off.
    fn default() -> Self {
        let workday = TimeRange::parse("09:00", "17:00").expect("static default hours");
        Self {
            days: [
                Some(workday),
                Some(workday),
                Some(workday),
                Some(workday),
                Some(workday),
                None,
                None,
            ],
        }
    }
}
