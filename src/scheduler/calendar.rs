//! Month arithmetic and candidate date enumeration

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{SchedulerError, SchedulerResult};
use crate::config::RosterConfig;
use crate::models::{EventFamily, EventKind};

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> SchedulerResult<Self> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(SchedulerError::invalid_month(year, month));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// Every day of the month in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last_day();
        self.first_day().iter_days().take_while(move |d| *d <= last)
    }

    /// Dates falling on either weekly event day, ascending, with their kind
    pub fn generation_dates(&self, roster: &RosterConfig) -> Vec<(NaiveDate, EventKind)> {
        self.days()
            .filter_map(|date| match roster.family_of_weekday(date.weekday()) {
                Some(EventFamily::Primary) => Some((date, EventKind::Primary)),
                Some(EventFamily::Secondary) => Some((date, EventKind::Secondary)),
                None => None,
            })
            .collect()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = SchedulerError;

    /// Parses `YYYY-MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| SchedulerError::invalid_month_format(s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| SchedulerError::invalid_month_format(s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| SchedulerError::invalid_month_format(s))?;
        Self::new(year, month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_bounds() {
        let feb = YearMonth::new(2026, 2).unwrap();
        assert_eq!(feb.first_day(), date(2026, 2, 1));
        assert_eq!(feb.last_day(), date(2026, 2, 28));

        let dec = YearMonth::new(2025, 12).unwrap();
        assert_eq!(dec.last_day(), date(2025, 12, 31));
        assert_eq!(dec.days().count(), 31);

        let leap = YearMonth::new(2028, 2).unwrap();
        assert_eq!(leap.last_day(), date(2028, 2, 29));
    }

    #[test]
    fn test_invalid_month() {
        assert!(YearMonth::new(2026, 0).is_err());
        assert!(YearMonth::new(2026, 13).is_err());
        assert!("2026/02".parse::<YearMonth>().is_err());
        assert!("2026-xx".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_parse_and_display() {
        let ym: YearMonth = "2026-02".parse().unwrap();
        assert_eq!(ym, YearMonth { year: 2026, month: 2 });
        assert_eq!(ym.to_string(), "2026-02");
        assert_eq!(YearMonth::of(date(2026, 3, 15)).to_string(), "2026-03");
    }

    #[test]
    fn test_generation_dates_for_february_2026() {
        let roster = RosterConfig::default();
        let dates = YearMonth::new(2026, 2).unwrap().generation_dates(&roster);

        let expected = vec![
            (date(2026, 2, 1), EventKind::Primary),
            (date(2026, 2, 6), EventKind::Secondary),
            (date(2026, 2, 8), EventKind::Primary),
            (date(2026, 2, 13), EventKind::Secondary),
            (date(2026, 2, 15), EventKind::Primary),
            (date(2026, 2, 20), EventKind::Secondary),
            (date(2026, 2, 22), EventKind::Primary),
            (date(2026, 2, 27), EventKind::Secondary),
        ];
        assert_eq!(dates, expected);
    }
}
