//! Availability oracle
//!
//! Answers whether a roster member may work on a given date. Two sources are
//! consulted: the static blackout windows from configuration, and the stored
//! unavailability periods, which may carry a recurring pattern such as
//! "every Friday" or "2nd Sunday of the month".

use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::config::RosterConfig;
use crate::models::{ParseModelError, Unavailability};
use crate::storage::{RosterRepository, StorageResult};

static PATTERN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(every)|([1-5])(st|nd|rd|th))_([a-z]+)$").unwrap()
});

/// Recurring restriction inside an unavailability period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RecurrencePattern {
    /// Every occurrence of the weekday
    Every(Weekday),
    /// The n-th occurrence of the weekday within its month (1..=5)
    Nth { n: u32, weekday: Weekday },
}

impl RecurrencePattern {
    pub fn matches(&self, date: NaiveDate) -> bool {
        match *self {
            Self::Every(weekday) => date.weekday() == weekday,
            Self::Nth { n, weekday } => date.weekday() == weekday && week_of_month(date) == n,
        }
    }
}

/// 1-based week of month: days 1-7 are week 1, 8-14 week 2, and so on
pub fn week_of_month(date: NaiveDate) -> u32 {
    (date.day() - 1) / 7 + 1
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

fn ordinal_suffix(n: u32) -> &'static str {
    match n {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Every(weekday) => write!(f, "every_{}", weekday_name(weekday)),
            Self::Nth { n, weekday } => {
                write!(f, "{n}{}_{}", ordinal_suffix(n), weekday_name(weekday))
            }
        }
    }
}

impl FromStr for RecurrencePattern {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseModelError {
            kind: "recurrence pattern",
            value: s.to_string(),
        };

        let normalized = s.trim().to_lowercase();
        let caps = PATTERN_REGEX.captures(&normalized).ok_or_else(invalid)?;
        let weekday: Weekday = caps[4].parse().map_err(|_| invalid())?;

        if caps.get(1).is_some() {
            return Ok(Self::Every(weekday));
        }

        let n: u32 = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(invalid)?;
        if caps.get(3).map(|m| m.as_str()) != Some(ordinal_suffix(n)) {
            return Err(invalid());
        }
        Ok(Self::Nth { n, weekday })
    }
}

impl From<RecurrencePattern> for String {
    fn from(pattern: RecurrencePattern) -> Self {
        pattern.to_string()
    }
}

impl TryFrom<String> for RecurrencePattern {
    type Error = ParseModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Read-only view over blackouts and stored unavailability, built once per
/// generation run or lifecycle call
#[derive(Debug, Clone, Default)]
pub struct AvailabilityOracle {
    blackouts: HashMap<String, Vec<(NaiveDate, NaiveDate)>>,
    periods: HashMap<String, Vec<Unavailability>>,
}

impl AvailabilityOracle {
    pub fn new(roster: &RosterConfig, periods: Vec<Unavailability>) -> Self {
        let mut blackouts: HashMap<String, Vec<(NaiveDate, NaiveDate)>> = HashMap::new();
        for blackout in &roster.blackouts {
            blackouts
                .entry(blackout.person.clone())
                .or_default()
                .push((blackout.start, blackout.end));
        }

        let mut by_person: HashMap<String, Vec<Unavailability>> = HashMap::new();
        for period in periods {
            by_person.entry(period.person.clone()).or_default().push(period);
        }

        Self {
            blackouts,
            periods: by_person,
        }
    }

    /// Build from configuration plus every stored period
    pub fn load(roster: &RosterConfig, repo: &dyn RosterRepository) -> StorageResult<Self> {
        let periods = repo.list_unavailability(None)?;
        Ok(Self::new(roster, periods))
    }

    pub fn is_available(&self, person: &str, date: NaiveDate) -> bool {
        let blacked_out = self
            .blackouts
            .get(person)
            .is_some_and(|windows| windows.iter().any(|(s, e)| *s <= date && date <= *e));
        if blacked_out {
            return false;
        }

        !self
            .periods
            .get(person)
            .is_some_and(|periods| periods.iter().any(|p| p.covers(date)))
    }
}
