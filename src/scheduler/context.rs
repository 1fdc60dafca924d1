//! Per-run mutable generation state
//!
//! One [`GenerationContext`] is built at the start of every generation call
//! and dropped at the end of it. It owns the running history and monthly
//! tallies; every filled slot is committed into it immediately so later slots
//! of the same date, and later dates of the same month, see the new load.

use chrono::NaiveDate;

use crate::availability::AvailabilityOracle;
use crate::config::{PolicyConfig, RosterConfig};
use crate::history::{History, MonthlyTallies, MonthlyTally};
use crate::models::{EventFamily, Role};

/// The role slot being filled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub date: NaiveDate,
    pub role: Role,
    pub family: EventFamily,
}

impl Slot {
    pub fn new(date: NaiveDate, role: Role) -> Self {
        Self {
            date,
            role,
            family: role.family(),
        }
    }

    /// True for the leader slot of a secondary-family event
    pub fn is_leader(&self) -> bool {
        self.family == EventFamily::Secondary && self.role == Role::Leader
    }
}

/// Whether the minimum-gap rule takes part in the cap check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapRule {
    Enforce,
    Relax,
}

pub struct GenerationContext<'a> {
    pub roster: &'a RosterConfig,
    pub policy: &'a PolicyConfig,
    pub oracle: &'a AvailabilityOracle,
    pub history: History,
    pub tallies: MonthlyTallies,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        roster: &'a RosterConfig,
        policy: &'a PolicyConfig,
        oracle: &'a AvailabilityOracle,
        history: History,
        tallies: MonthlyTallies,
    ) -> Self {
        Self {
            roster,
            policy,
            oracle,
            history,
            tallies,
        }
    }

    pub fn tally(&self, person: &str) -> MonthlyTally {
        self.tallies.get(person)
    }

    /// Monthly total cap: base, plus the priority allowance, plus the
    /// catch-up allowance for anyone trailing the live all-time average
    pub fn effective_total_cap(&self, person: &str) -> u32 {
        let mut cap = self.policy.monthly_total_cap;
        if self.roster.in_priority_pool(person) {
            cap += self.policy.priority_extra;
        }
        let total = f64::from(self.history.stats(person).total);
        if total < self.history.average_total() - self.policy.catch_up_margin {
            cap += self.policy.catch_up_extra;
        }
        cap
    }

    pub fn primary_cap(&self, person: &str) -> u32 {
        self.roster
            .person(person)
            .and_then(|p| p.primary_cap)
            .unwrap_or(self.policy.primary_monthly_cap)
    }

    pub fn leader_cap(&self, person: &str) -> u32 {
        self.roster
            .person(person)
            .and_then(|p| p.leader_cap)
            .unwrap_or(self.policy.leader_monthly_cap)
    }

    pub fn is_available(&self, person: &str, date: NaiveDate) -> bool {
        self.oracle.is_available(person, date)
    }

    /// True when assigning `date` would put two primary-family slots closer
    /// than the minimum gap
    pub fn violates_gap(&self, person: &str, date: NaiveDate) -> bool {
        self.tally(person)
            .days_since_primary(date)
            .is_some_and(|days| days < self.policy.min_primary_gap_days)
    }

    /// Hard cap filter for `slot`
    pub fn within_caps(&self, person: &str, slot: &Slot, gap: GapRule) -> bool {
        let tally = self.tally(person);
        if tally.total >= self.effective_total_cap(person) {
            return false;
        }
        match slot.family {
            EventFamily::Primary => {
                if tally.primary >= self.primary_cap(person) {
                    return false;
                }
                if gap == GapRule::Enforce && self.violates_gap(person, slot.date) {
                    return false;
                }
            }
            EventFamily::Secondary => {
                if slot.is_leader() && tally.leader >= self.leader_cap(person) {
                    return false;
                }
            }
        }
        true
    }

    /// Record a filled slot in every running counter
    pub fn commit(&mut self, person: &str, slot: &Slot) {
        self.history.record(person, slot.date, Some(slot.family));
        self.tallies
            .record(person, slot.date, slot.role, Some(slot.family));
    }
}
