//! History aggregation
//!
//! Scans persisted events and derives, per roster member, all-time totals by
//! event family and the chronological list of worked dates. The same pass over
//! one month's events yields the [`MonthlyTally`] counters that generation
//! uses to enforce monthly caps.
//!
//! A slot is attributed to whoever actually works it: the cover when one is
//! set, otherwise the assigned person. Sentinels are never counted.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::config::RosterConfig;
use crate::models::{Event, EventFamily, EventKind, Role};

/// Which family an event counts toward for fairness and caps
///
/// An event is primary-family when its kind is primary, it falls on the
/// primary weekday, or it is a custom event carrying a primary-type role.
/// It is secondary-family when its kind is secondary or it falls on the
/// secondary weekday.
pub fn classify(event: &Event, roster: &RosterConfig) -> Option<EventFamily> {
    let by_weekday = roster.family_of_weekday(chrono::Datelike::weekday(&event.date));
    let custom_primary = event.kind == EventKind::Custom
        && event
            .assignments
            .iter()
            .any(|a| a.role.family() == EventFamily::Primary);

    if event.kind == EventKind::Primary
        || by_weekday == Some(EventFamily::Primary)
        || custom_primary
    {
        Some(EventFamily::Primary)
    } else if event.kind == EventKind::Secondary || by_weekday == Some(EventFamily::Secondary) {
        Some(EventFamily::Secondary)
    } else {
        None
    }
}

/// All-time counters for one person
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersonStats {
    pub total: u32,
    pub primary: u32,
    pub secondary: u32,
}

impl PersonStats {
    fn record(&mut self, family: Option<EventFamily>) {
        self.total += 1;
        match family {
            Some(EventFamily::Primary) => self.primary += 1,
            Some(EventFamily::Secondary) => self.secondary += 1,
            None => {}
        }
    }
}

/// All-time history for every roster member
#[derive(Debug, Clone, Default)]
pub struct History {
    stats: HashMap<String, PersonStats>,
    worked: HashMap<String, Vec<NaiveDate>>,
}

impl History {
    /// Aggregate over `events`; names not on the roster are ignored
    pub fn aggregate(events: &[Event], roster: &RosterConfig) -> Self {
        let mut history = Self {
            stats: roster
                .names()
                .map(|n| (n.to_string(), PersonStats::default()))
                .collect(),
            worked: roster.names().map(|n| (n.to_string(), Vec::new())).collect(),
        };

        for event in events {
            let family = classify(event, roster);
            for assignment in &event.assignments {
                let Some(worker) = assignment.worker() else {
                    continue;
                };
                if history.stats.contains_key(worker) {
                    history.record(worker, event.date, family);
                }
            }
        }

        for dates in history.worked.values_mut() {
            dates.sort_unstable();
        }
        history
    }

    pub fn stats(&self, person: &str) -> PersonStats {
        self.stats.get(person).copied().unwrap_or_default()
    }

    /// Mean all-time total across the roster
    pub fn average_total(&self) -> f64 {
        if self.stats.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.stats.values().map(|s| s.total).sum();
        f64::from(sum) / self.stats.len() as f64
    }

    /// Worked dates in ascending order
    pub fn worked_dates(&self, person: &str) -> &[NaiveDate] {
        self.worked.get(person).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Most recent worked date on or before `date`
    pub fn last_worked_on_or_before(&self, person: &str, date: NaiveDate) -> Option<NaiveDate> {
        let dates = self.worked_dates(person);
        let idx = dates.partition_point(|d| *d <= date);
        idx.checked_sub(1).map(|i| dates[i])
    }

    /// Count one more assignment, keeping worked dates sorted
    pub fn record(&mut self, person: &str, date: NaiveDate, family: Option<EventFamily>) {
        self.stats.entry(person.to_string()).or_default().record(family);
        let dates = self.worked.entry(person.to_string()).or_default();
        let idx = dates.partition_point(|d| *d <= date);
        dates.insert(idx, date);
    }
}

/// Per-person counters for one month
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonthlyTally {
    pub total: u32,
    pub primary: u32,
    /// Leader slots on secondary-family events
    pub leader: u32,
    pub last_primary_date: Option<NaiveDate>,
}

impl MonthlyTally {
    pub fn record(&mut self, date: NaiveDate, role: Role, family: Option<EventFamily>) {
        self.total += 1;
        match family {
            Some(EventFamily::Primary) => {
                self.primary += 1;
                if self.last_primary_date.map_or(true, |prev| date > prev) {
                    self.last_primary_date = Some(date);
                }
            }
            Some(EventFamily::Secondary) if role == Role::Leader => self.leader += 1,
            _ => {}
        }
    }

    /// Days since the latest primary-family assignment this month, if any
    pub fn days_since_primary(&self, date: NaiveDate) -> Option<i64> {
        self.last_primary_date.map(|last| (date - last).num_days())
    }
}

/// Tallies for every roster member, rebuilt from the target month's events
#[derive(Debug, Clone, Default)]
pub struct MonthlyTallies {
    tallies: HashMap<String, MonthlyTally>,
}

impl MonthlyTallies {
    pub fn from_events(events: &[Event], roster: &RosterConfig) -> Self {
        let mut tallies: HashMap<String, MonthlyTally> = roster
            .names()
            .map(|n| (n.to_string(), MonthlyTally::default()))
            .collect();

        for event in events {
            let family = classify(event, roster);
            for assignment in &event.assignments {
                let Some(worker) = assignment.worker() else {
                    continue;
                };
                if let Some(tally) = tallies.get_mut(worker) {
                    tally.record(event.date, assignment.role, family);
                }
            }
        }

        Self { tallies }
    }

    pub fn get(&self, person: &str) -> MonthlyTally {
        self.tallies.get(person).copied().unwrap_or_default()
    }

    pub fn record(&mut self, person: &str, date: NaiveDate, role: Role, family: Option<EventFamily>) {
        self.tallies
            .entry(person.to_string())
            .or_default()
            .record(date, role, family);
    }
}
